use audius_contracts::{governance::Vote, AudiusContracts, ServiceType};
use audius_error::AudiusSignerProvider;
use clap::Parser;
use dialoguer::Confirm;
use ethers::types::{Address, U256};

use crate::{
    error::Error,
    utils::{audio, parse_amount, print_receipt},
};

#[derive(Parser, Debug, Clone)]
pub enum TxCommands {
    #[command(name = "delegate", about = "Approve and delegate AUDIO to a service provider <SP> <AMOUNT>")]
    Delegate { sp: Address, amount: String },
    #[command(
        name = "request-undelegate",
        about = "Start the undelegate lockup for an amount <SP> <AMOUNT>"
    )]
    RequestUndelegate { sp: Address, amount: String },
    #[command(name = "cancel-undelegate", about = "Cancel the pending undelegate request")]
    CancelUndelegate,
    #[command(name = "undelegate", about = "Complete an undelegate request whose lockup expired")]
    Undelegate,
    #[command(name = "claim", about = "Claim pending rewards of a service provider <SP>")]
    Claim { sp: Address },
    #[command(name = "vote", about = "Vote on a governance proposal <ID> <yes|no>")]
    Vote {
        proposal_id: u64,
        #[arg(value_parser = parse_ballot)]
        vote: Vote,
        /// Change an existing vote instead of casting a new one
        #[arg(long)]
        update: bool,
    },
    #[command(name = "register", about = "Approve stake and register an endpoint <TYPE> <ENDPOINT> <AMOUNT>")]
    Register {
        service_type: ServiceType,
        endpoint: String,
        amount: String,
        /// Wallet the node signs with, defaults to the sender
        #[arg(long)]
        delegate_owner_wallet: Option<Address>,
    },
    #[command(name = "increase-stake", about = "Approve and add to the deployer stake <AMOUNT>")]
    IncreaseStake { amount: String },
    #[command(
        name = "transfer-to-solana",
        about = "Bridge the rewards manager balance to Solana <ARBITER_FEE> <NONCE>"
    )]
    TransferToSolana { arbiter_fee: String, nonce: u32 },
}

/// Only yes and no can be cast; `none` is the state of an account that has not voted.
fn parse_ballot(s: &str) -> Result<Vote, String> {
    match s.parse::<Vote>() {
        Ok(Vote::None) | Err(_) => Err(format!("vote must be yes or no, got {s}")),
        Ok(vote) => Ok(vote),
    }
}

impl TxCommands {
    fn name(&self) -> &'static str {
        match self {
            TxCommands::Delegate { .. } => "delegate",
            TxCommands::RequestUndelegate { .. } => "request-undelegate",
            TxCommands::CancelUndelegate => "cancel-undelegate",
            TxCommands::Undelegate => "undelegate",
            TxCommands::Claim { .. } => "claim",
            TxCommands::Vote { .. } => "vote",
            TxCommands::Register { .. } => "register",
            TxCommands::IncreaseStake { .. } => "increase-stake",
            TxCommands::TransferToSolana { .. } => "transfer-to-solana",
        }
    }
}

pub async fn parse_tx_subcommands(
    subcmd: TxCommands,
    contracts: &AudiusContracts<AudiusSignerProvider>,
    skip_confirm: bool,
) -> Result<(), Error> {
    if !skip_confirm {
        let sender = contracts.client().address();
        let confirmed = Confirm::new()
            .with_prompt(format!("Send `{}` from {sender:?}?", subcmd.name()))
            .default(false)
            .interact()?;
        if !confirmed {
            return Err(Error::TxAborted);
        }
    }

    match subcmd {
        TxCommands::Delegate { sp, amount } => {
            let amount = parse_amount(&amount)?;
            let receipt = contracts.delegate_with_approval(sp, amount).await?;
            print_receipt(&format!("Delegated {} to {sp:?}", audio(amount)), &receipt);
        }
        TxCommands::RequestUndelegate { sp, amount } => {
            let amount = parse_amount(&amount)?;
            let manager = contracts.delegate_manager().await?;
            let receipt = manager.request_undelegate_stake(sp, amount).await?;
            print_receipt("Undelegate requested", &receipt);
            let pending = manager.pending_undelegate(contracts.client().address()).await?;
            println!("Lockup ends at block {}", pending.lockup_expiry_block);
        }
        TxCommands::CancelUndelegate => {
            let receipt = contracts.delegate_manager().await?.cancel_undelegate_stake().await?;
            print_receipt("Undelegate cancelled", &receipt);
        }
        TxCommands::Undelegate => {
            let receipt = contracts.delegate_manager().await?.undelegate_stake().await?;
            print_receipt("Undelegated", &receipt);
        }
        TxCommands::Claim { sp } => {
            let receipt = contracts.delegate_manager().await?.claim_rewards(sp).await?;
            print_receipt(&format!("Claimed rewards of {sp:?}"), &receipt);
        }
        TxCommands::Vote { proposal_id, vote, update } => {
            let governance = contracts.governance().await?;
            let id = U256::from(proposal_id);
            let receipt = if update {
                governance.update_vote(id, vote).await?
            } else {
                governance.submit_vote(id, vote).await?
            };
            print_receipt(&format!("Voted {vote} on proposal {proposal_id}"), &receipt);
        }
        TxCommands::Register { service_type, endpoint, amount, delegate_owner_wallet } => {
            let amount = parse_amount(&amount)?;
            let wallet = delegate_owner_wallet.unwrap_or_else(|| contracts.client().address());
            let (receipt, registration) =
                contracts.register_with_stake(&service_type, &endpoint, amount, wallet).await?;
            print_receipt(
                &format!("Registered {service_type} #{}", registration.sp_id),
                &receipt,
            );
        }
        TxCommands::IncreaseStake { amount } => {
            let amount = parse_amount(&amount)?;
            let receipt = contracts.increase_stake_with_approval(amount).await?;
            print_receipt(&format!("Stake increased by {}", audio(amount)), &receipt);
        }
        TxCommands::TransferToSolana { arbiter_fee, nonce } => {
            let fee = parse_amount(&arbiter_fee)?;
            let receipt = contracts.rewards_manager().await?.transfer_to_solana(fee, nonce).await?;
            print_receipt("Rewards bridged to Solana", &receipt);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ballot_rejects_none() {
        assert_eq!(parse_ballot("Y").unwrap(), Vote::Yes);
        assert_eq!(parse_ballot("no").unwrap(), Vote::No);
        assert!(parse_ballot("none").is_err());
        assert!(parse_ballot("abstain").is_err());
    }
}
