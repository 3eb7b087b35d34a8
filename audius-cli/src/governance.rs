use audius_contracts::AudiusContracts;
use audius_error::AudiusProvider;
use clap::Parser;
use ethers::types::Address;

use crate::{error::Error, utils::print_json};

#[derive(Parser, Debug, Clone)]
pub enum GovernanceCommands {
    #[command(name = "proposal", about = "Decoded proposal <ID>")]
    Proposal { proposal_id: u64 },
    #[command(name = "vote", about = "Vote an address cast on a proposal <ID> <VOTER>")]
    Vote { proposal_id: u64, voter: Address },
    #[command(name = "in-progress", about = "Ids of proposals that are still open")]
    InProgress,
    #[command(name = "params", about = "Voting period, quorum, execution delay and guardian")]
    Params,
}

pub async fn parse_governance_subcommands(
    subcmd: GovernanceCommands,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let governance = contracts.governance().await?;
    match subcmd {
        GovernanceCommands::Proposal { proposal_id } => {
            print_json(&governance.proposal(proposal_id.into()).await?)?;
        }
        GovernanceCommands::Vote { proposal_id, voter } => {
            let vote = governance.vote(proposal_id.into(), voter).await?;
            println!("{voter:?} voted {} with magnitude {}", vote.vote, vote.vote_magnitude);
        }
        GovernanceCommands::InProgress => {
            let ids = governance.in_progress_proposals().await?;
            if ids.is_empty() {
                println!("No proposals in progress");
            }
            for id in ids {
                println!("{id}");
            }
        }
        GovernanceCommands::Params => {
            let (params, guardian) =
                futures::try_join!(governance.governance_params(), governance.guardian())?;
            print_json(&params)?;
            println!("Guardian: {guardian:?}");
        }
    }
    Ok(())
}
