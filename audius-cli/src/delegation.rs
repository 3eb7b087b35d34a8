use audius_contracts::AudiusContracts;
use audius_error::AudiusProvider;
use clap::Parser;
use ethers::types::Address;

use crate::{
    error::Error,
    utils::{audio, print_json},
};

#[derive(Parser, Debug, Clone)]
pub enum DelegationCommands {
    #[command(
        name = "stake",
        about = "Stake a delegator has with one service provider, or in total <DELEGATOR> <<SP>>"
    )]
    Stake { delegator: Address, sp: Option<Address> },
    #[command(name = "summary", about = "Delegators of a service provider and their stake <SP>")]
    Summary { sp: Address },
    #[command(name = "pending", about = "Pending undelegation of a delegator <DELEGATOR>")]
    Pending { delegator: Address },
    #[command(name = "params", about = "Lockup durations and delegation limits")]
    Params,
}

pub async fn parse_delegation_subcommands(
    subcmd: DelegationCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let manager = contracts.delegate_manager().await?;
    match subcmd {
        DelegationCommands::Stake { delegator, sp: Some(sp) } => {
            let stake = manager.delegator_stake(delegator, sp).await?;
            println!("{delegator:?} delegates {} to {sp:?}", audio(stake));
        }
        DelegationCommands::Stake { delegator, sp: None } => {
            let stake = manager.total_delegator_stake(delegator).await?;
            println!("{delegator:?} delegates {} in total", audio(stake));
        }
        DelegationCommands::Summary { sp } => {
            let summary = manager.delegation_summary(sp).await?;
            for delegator in &summary.delegators {
                println!("{:?}  {}", delegator.delegator, audio(delegator.amount));
            }
            println!(
                "{} delegators, {} delegated, {} locked",
                summary.delegators.len(),
                audio(summary.total_delegated),
                audio(summary.total_locked)
            );
        }
        DelegationCommands::Pending { delegator } => {
            let pending = manager.pending_undelegate(delegator).await?;
            if pending.is_pending() {
                println!(
                    "Undelegating {} from {:?}, unlocks at block {}",
                    audio(pending.amount),
                    pending.target,
                    pending.lockup_expiry_block
                );
            } else {
                println!("No pending undelegation for {delegator:?}");
            }
        }
        DelegationCommands::Params => print_json(&manager.delegation_params().await?)?,
    }
    Ok(())
}
