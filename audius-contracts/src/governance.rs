use std::{ops::Deref, sync::Arc};

use audius_error::{AudiusError, Result};
use ethers::{
    contract::{EthEvent, LogMeta},
    providers::Middleware,
    types::{Address, Bytes, Filter, TransactionReceipt, U256},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::{
    bindings::{
        governance::{
            ProposalOutcomeEvaluatedFilter, ProposalSubmittedFilter, ProposalVoteSubmittedFilter,
            ProposalVoteUpdatedFilter,
        },
        GovernanceAbi, GovernanceAbiEvents,
    },
    events::fetch_events_between,
    key::from_bytes32,
    tx::{address_topic, find_event, send_and_confirm, uint_topic, with_topics},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Vote {
    None,
    #[strum(to_string = "no", serialize = "n")]
    No,
    #[strum(to_string = "yes", serialize = "y")]
    Yes,
}

impl TryFrom<u8> for Vote {
    type Error = AudiusError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Vote::None),
            1 => Ok(Vote::No),
            2 => Ok(Vote::Yes),
            value => Err(AudiusError::UnknownEnumValue { kind: "Vote", value }),
        }
    }
}

impl From<Vote> for u8 {
    fn from(value: Vote) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    Rejected,
    ApprovedExecuted,
    QuorumNotMet,
    ApprovedExecutionFailed,
    Evaluating,
    Vetoed,
    TargetContractAddressChanged,
    TargetContractCodeHashChanged,
}

impl Outcome {
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::InProgress | Outcome::Evaluating)
    }
}

impl TryFrom<u8> for Outcome {
    type Error = AudiusError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Outcome::InProgress,
            1 => Outcome::Rejected,
            2 => Outcome::ApprovedExecuted,
            3 => Outcome::QuorumNotMet,
            4 => Outcome::ApprovedExecutionFailed,
            5 => Outcome::Evaluating,
            6 => Outcome::Vetoed,
            7 => Outcome::TargetContractAddressChanged,
            8 => Outcome::TargetContractCodeHashChanged,
            value => return Err(AudiusError::UnknownEnumValue { kind: "Outcome", value }),
        })
    }
}

type ProposalTuple =
    (U256, Address, U256, [u8; 32], Address, U256, String, Bytes, u8, U256, U256, U256);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: U256,
    pub proposer: Address,
    pub submission_block_number: U256,
    /// Registry name of the contract the proposal calls.
    pub target_contract_registry_key: String,
    pub target_contract_address: Address,
    pub call_value: U256,
    pub function_signature: String,
    pub call_data: Bytes,
    pub outcome: Outcome,
    pub vote_magnitude_yes: U256,
    pub vote_magnitude_no: U256,
    pub num_votes: U256,
}

impl TryFrom<ProposalTuple> for Proposal {
    type Error = AudiusError;

    fn try_from(value: ProposalTuple) -> Result<Self> {
        let (
            proposal_id,
            proposer,
            submission_block_number,
            target_contract_registry_key,
            target_contract_address,
            call_value,
            function_signature,
            call_data,
            outcome,
            vote_magnitude_yes,
            vote_magnitude_no,
            num_votes,
        ) = value;
        Ok(Self {
            proposal_id,
            proposer,
            submission_block_number,
            target_contract_registry_key: from_bytes32(target_contract_registry_key)?,
            target_contract_address,
            call_value,
            function_signature,
            call_data,
            outcome: outcome.try_into()?,
            vote_magnitude_yes,
            vote_magnitude_no,
            num_votes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub vote: Vote,
    pub vote_magnitude: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    pub voting_period: U256,
    pub voting_quorum_percent: U256,
    pub execution_delay: U256,
    pub max_in_progress_proposals: u16,
}

/// A new vote or a changed vote. `previous_vote` is only set for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub proposal_id: U256,
    pub voter: Address,
    pub vote: Vote,
    pub voter_stake: U256,
    pub previous_vote: Option<Vote>,
}

impl VoteEvent {
    fn from_governance_event(event: GovernanceAbiEvents) -> Option<Result<Self>> {
        match event {
            GovernanceAbiEvents::ProposalVoteSubmittedFilter(e) => {
                Some(Vote::try_from(e.vote).map(|vote| VoteEvent {
                    proposal_id: e.proposal_id,
                    voter: e.voter,
                    vote,
                    voter_stake: e.voter_stake,
                    previous_vote: None,
                }))
            }
            GovernanceAbiEvents::ProposalVoteUpdatedFilter(e) => Some(Self::updated(e)),
            _ => None,
        }
    }

    fn updated(e: ProposalVoteUpdatedFilter) -> Result<Self> {
        Ok(VoteEvent {
            proposal_id: e.proposal_id,
            voter: e.voter,
            vote: e.vote.try_into()?,
            voter_stake: e.voter_stake,
            previous_vote: Some(e.previous_vote.try_into()?),
        })
    }
}

/// Governance wrapper. Proposals target contracts by registry key and are decided by
/// stake-weighted votes.
#[derive(Clone, Debug)]
pub struct Governance<M: Middleware> {
    inner: GovernanceAbi<M>,
}

impl<M: Middleware> Deref for Governance<M> {
    type Target = GovernanceAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> Governance<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: GovernanceAbi::new(address, client) }
    }

    pub async fn proposal(&self, proposal_id: U256) -> Result<Proposal> {
        self.get_proposal_by_id(proposal_id).call().await?.try_into()
    }

    pub async fn vote(&self, proposal_id: U256, voter: Address) -> Result<VoteInfo> {
        let (vote, vote_magnitude) =
            self.get_vote_info_by_proposal_and_voter(proposal_id, voter).call().await?;
        Ok(VoteInfo { vote: vote.try_into()?, vote_magnitude })
    }

    pub async fn in_progress_proposals(&self) -> Result<Vec<U256>> {
        Ok(self.get_in_progress_proposals().call().await?)
    }

    pub async fn governance_params(&self) -> Result<GovernanceParams> {
        let voting_period = self.get_voting_period();
        let quorum = self.get_voting_quorum_percent();
        let execution_delay = self.get_execution_delay();
        let max_in_progress = self.get_max_in_progress_proposals();
        let (voting_period, voting_quorum_percent, execution_delay, max_in_progress_proposals) =
            futures::try_join!(
                voting_period.call(),
                quorum.call(),
                execution_delay.call(),
                max_in_progress.call(),
            )?;
        Ok(GovernanceParams {
            voting_period,
            voting_quorum_percent,
            execution_delay,
            max_in_progress_proposals,
        })
    }

    pub async fn guardian(&self) -> Result<Address> {
        Ok(self.get_guardian_address().call().await?)
    }

    /// Submits a proposal and returns its id, read from the `ProposalSubmitted` event.
    pub async fn submit_proposal(
        &self,
        target_contract_registry_key: [u8; 32],
        call_value: U256,
        function_signature: &str,
        call_data: Bytes,
        name: &str,
        description: &str,
    ) -> Result<(TransactionReceipt, U256)> {
        let call = self.inner.submit_proposal(
            target_contract_registry_key,
            call_value,
            function_signature.to_owned(),
            call_data,
            name.to_owned(),
            description.to_owned(),
        );
        let receipt = send_and_confirm(call, "submit proposal").await?;
        let submitted = find_event::<ProposalSubmittedFilter>(&receipt)?;
        Ok((receipt, submitted.proposal_id))
    }

    pub async fn submit_vote(&self, proposal_id: U256, vote: Vote) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.submit_vote(proposal_id, vote.into()), "submit vote").await
    }

    pub async fn update_vote(&self, proposal_id: U256, vote: Vote) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.update_vote(proposal_id, vote.into()), "update vote").await
    }

    pub async fn evaluate_proposal_outcome(
        &self,
        proposal_id: U256,
    ) -> Result<(TransactionReceipt, Outcome)> {
        let call = self.inner.evaluate_proposal_outcome(proposal_id);
        let receipt = send_and_confirm(call, "evaluate proposal").await?;
        let evaluated = find_event::<ProposalOutcomeEvaluatedFilter>(&receipt)?;
        Ok((receipt, evaluated.outcome.try_into()?))
    }

    pub async fn proposal_submitted_events(
        &self,
        proposer: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(ProposalSubmittedFilter, LogMeta)>> {
        let filter =
            Filter::new().address(self.address()).topic0(ProposalSubmittedFilter::signature());
        let filter = with_topics(filter, [None, proposer.map(address_topic), None]);
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    pub async fn vote_events(
        &self,
        proposal_id: Option<U256>,
        voter: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(VoteEvent, LogMeta)>> {
        let filter = Filter::new().address(self.address()).events([
            ProposalVoteSubmittedFilter::abi_signature().into_owned(),
            ProposalVoteUpdatedFilter::abi_signature().into_owned(),
        ]);
        let filter =
            with_topics(filter, [proposal_id.map(uint_topic), voter.map(address_topic), None]);
        let events: Vec<(GovernanceAbiEvents, LogMeta)> =
            fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await?;
        Ok(events
            .into_iter()
            .filter_map(|(event, meta)| match VoteEvent::from_governance_event(event)? {
                Ok(vote) => Some((vote, meta)),
                Err(e) => {
                    warn!("Skipping vote {:?}#{}: {e}", meta.transaction_hash, meta.log_index);
                    None
                }
            })
            .collect())
    }
}
