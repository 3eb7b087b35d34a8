use audius_contracts::AudiusContracts;
use audius_error::AudiusProvider;
use clap::Parser;
use ethers::types::Address;

use crate::{
    error::Error,
    utils::{audio, print_json},
};

#[derive(Parser, Debug, Clone)]
pub enum TokenCommands {
    #[command(name = "info", about = "Name, symbol, decimals and supply of the AUDIO token")]
    Info,
    #[command(name = "balance", about = "AUDIO balance of an address <ADDRESS>")]
    Balance { address: Address },
    #[command(name = "allowance", about = "Amount a spender may pull from an owner <OWNER> <SPENDER>")]
    Allowance { owner: Address, spender: Address },
}

#[derive(Parser, Debug, Clone)]
pub enum RewardsCommands {
    #[command(name = "info", about = "Token, governance, Solana recipient and oracles of the bridge")]
    Info,
    #[command(name = "round", about = "Funding round of the claims manager")]
    Round,
    #[command(name = "claim-pending", about = "Whether a service provider can still claim this round <SP>")]
    ClaimPending { sp: Address },
}

pub async fn parse_token_subcommands(
    subcmd: TokenCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let token = contracts.token();
    match subcmd {
        TokenCommands::Info => {
            let info = token.token_info().await?;
            print_json(&info)?;
            println!("Total supply: {}", audio(info.total_supply));
        }
        TokenCommands::Balance { address } => {
            println!("{}", audio(token.balance_of(address).await?));
        }
        TokenCommands::Allowance { owner, spender } => {
            println!("{}", audio(token.allowance(owner, spender).await?));
        }
    }
    Ok(())
}

pub async fn parse_rewards_subcommands(
    subcmd: RewardsCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    match subcmd {
        RewardsCommands::Info => {
            let manager = contracts.rewards_manager().await?;
            let (info, balance) = futures::try_join!(manager.info(), async {
                contracts.token().balance_of(manager.address()).await
            })?;
            print_json(&info)?;
            println!("Awaiting transfer: {}", audio(balance));
        }
        RewardsCommands::Round => {
            let round = contracts.claims_manager().await?.round().await?;
            print_json(&round)?;
            println!("Unclaimed: {}", audio(round.unclaimed()));
            println!("Next round from block {}", round.next_round_block());
        }
        RewardsCommands::ClaimPending { sp } => {
            println!("{}", contracts.claims_manager().await?.claim_pending(sp).await?);
        }
    }
    Ok(())
}
