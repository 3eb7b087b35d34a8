use audius_contracts::{AudiusContracts, ServiceType};
use audius_error::AudiusProvider;
use clap::Parser;

use crate::{error::Error, utils::audio};

#[derive(Parser, Debug, Clone)]
pub enum ServiceTypeCommands {
    #[command(name = "list", about = "Service types accepted by the protocol")]
    List,
    #[command(name = "info", about = "Stake bounds and current version of a service type <TYPE>")]
    Info { service_type: ServiceType },
    #[command(name = "versions", about = "Every version published for a service type <TYPE>")]
    Versions { service_type: ServiceType },
}

pub async fn parse_service_type_subcommands(
    subcmd: ServiceTypeCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let manager = contracts.service_type_manager().await?;
    match subcmd {
        ServiceTypeCommands::List => {
            for service_type in manager.valid_service_types().await? {
                println!("{service_type}");
            }
        }
        ServiceTypeCommands::Info { service_type } => {
            let (info, version) = futures::try_join!(
                manager.service_type_info(&service_type),
                manager.current_version(&service_type),
            )?;
            println!("{service_type}");
            println!("  valid:           {}", info.is_valid);
            println!("  min stake:       {}", audio(info.min_stake));
            println!("  max stake:       {}", audio(info.max_stake));
            println!("  current version: {version}");
        }
        ServiceTypeCommands::Versions { service_type } => {
            for version in manager.versions(&service_type).await? {
                println!("{version}");
            }
        }
    }
    Ok(())
}
