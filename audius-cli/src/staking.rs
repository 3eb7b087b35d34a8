use audius_contracts::AudiusContracts;
use audius_error::AudiusProvider;
use clap::Parser;
use ethers::types::Address;

use crate::{
    error::Error,
    utils::{audio, print_json},
};

#[derive(Parser, Debug, Clone)]
pub enum StakingCommands {
    #[command(name = "total", about = "Total AUDIO staked in the protocol")]
    Total {
        #[arg(long)]
        at: Option<u64>,
    },
    #[command(name = "account", about = "Stake of one account, optionally at a past block <ADDRESS>")]
    Account {
        address: Address,
        #[arg(long)]
        at: Option<u64>,
    },
}

pub async fn parse_staking_subcommands(
    subcmd: StakingCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let staking = contracts.staking().await?;
    match subcmd {
        StakingCommands::Total { at } => {
            let total = match at {
                Some(block) => staking.total_staked_at(block).await?,
                None => staking.total_staked().await?,
            };
            println!("{}", audio(total));
        }
        StakingCommands::Account { address, at } => {
            let stake = staking.account_stake(address, at).await?;
            print_json(&stake)?;
            println!("Staked: {}", audio(stake.total_staked));
        }
    }
    Ok(())
}
