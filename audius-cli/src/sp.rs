use audius_contracts::{AudiusContracts, ServiceType};
use audius_error::AudiusProvider;
use clap::Parser;
use ethers::types::{Address, U256};

use crate::{
    error::Error,
    utils::{audio, print_json},
};

#[derive(Parser, Debug, Clone)]
pub enum SpCommands {
    #[command(name = "list", about = "List the registered endpoints of a service type <TYPE>")]
    List { service_type: ServiceType },
    #[command(name = "details", about = "Stake and deployer cut of a service provider <ADDRESS>")]
    Details { address: Address },
    #[command(name = "endpoint", about = "Endpoint registered in a slot <TYPE> <ID>")]
    Endpoint { service_type: ServiceType, sp_id: u64 },
    #[command(name = "ids", about = "Slot ids owned by an address <OWNER> <TYPE>")]
    Ids { owner: Address, service_type: ServiceType },
    #[command(name = "pending", about = "Pending stake decrease and deployer cut change <ADDRESS>")]
    Pending { address: Address },
    #[command(
        name = "history",
        about = "Last known endpoint of a slot, rebuilt from events <TYPE> <ID>"
    )]
    History {
        service_type: ServiceType,
        sp_id: u64,
        #[arg(long, default_value_t = 0)]
        from: u64,
    },
}

pub async fn parse_sp_subcommands(
    subcmd: SpCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let factory = contracts.service_provider_factory().await?;
    match subcmd {
        SpCommands::List { service_type } => {
            let endpoints = factory.list_service_providers(&service_type).await?;
            for sp in &endpoints {
                println!("{:>4}  {:?}  {}", sp.sp_id, sp.owner, sp.endpoint);
            }
            println!("{} registered {service_type} endpoints", endpoints.len());
        }
        SpCommands::Details { address } => {
            let details = factory.service_provider_details(address).await?;
            print_json(&details)?;
            println!("Deployer stake: {}", audio(details.deployer_stake));
        }
        SpCommands::Endpoint { service_type, sp_id } => {
            print_json(&factory.service_endpoint(&service_type, sp_id.into()).await?)?;
        }
        SpCommands::Ids { owner, service_type } => {
            let ids = factory.ids_for_owner(owner, &service_type).await?;
            println!("{}", ids.iter().map(U256::to_string).collect::<Vec<_>>().join(", "));
        }
        SpCommands::Pending { address } => {
            let (decrease, cut) = futures::try_join!(
                factory.pending_decrease_stake(address),
                factory.pending_deployer_cut(address),
            )?;
            if decrease.is_pending() {
                println!(
                    "Decrease of {} unlocks at block {}",
                    audio(decrease.value),
                    decrease.lockup_expiry_block
                );
            }
            if cut.is_pending() {
                println!(
                    "Deployer cut change to {} unlocks at block {}",
                    cut.value, cut.lockup_expiry_block
                );
            }
            if !decrease.is_pending() && !cut.is_pending() {
                println!("No pending requests for {address:?}");
            }
        }
        SpCommands::History { service_type, sp_id, from } => {
            let service = factory.deregistered_service(&service_type, sp_id.into(), from).await?;
            print_json(&service)?;
        }
    }
    Ok(())
}
