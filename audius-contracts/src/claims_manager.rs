use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    contract::{EthEvent, LogMeta},
    providers::Middleware,
    types::{Address, Filter, TransactionReceipt, U256},
};
use serde::{Deserialize, Serialize};

use crate::{
    bindings::{
        claims_manager::{ClaimProcessedFilter, RoundInitiatedFilter},
        ClaimsManagerAbi,
    },
    events::fetch_events_between,
    tx::{address_topic, find_event, send_and_confirm, with_topics},
};

/// State of the current funding round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRound {
    pub address: Address,
    pub last_funded_block: U256,
    pub funding_round_block_diff: U256,
    pub funds_per_round: U256,
    pub total_claimed_in_round: U256,
    pub recurring_community_funding_amount: U256,
    pub community_pool: Address,
}

impl FundingRound {
    /// First block at which `initiateRound` is accepted. The contract requires strictly more
    /// than `funding_round_block_diff` blocks since the last funded block.
    pub fn next_round_block(&self) -> U256 {
        self.last_funded_block
            .saturating_add(self.funding_round_block_diff)
            .saturating_add(U256::one())
    }

    pub fn can_initiate_at(&self, block: u64) -> bool {
        U256::from(block) >= self.next_round_block()
    }

    /// Funds of the round not yet claimed by service providers.
    pub fn unclaimed(&self) -> U256 {
        self.funds_per_round.saturating_sub(self.total_claimed_in_round)
    }
}

/// ClaimsManager wrapper. The contract mints a fixed amount of AUDIO per funding round and splits
/// it across service providers in proportion to their stake when they claim.
#[derive(Clone, Debug)]
pub struct ClaimsManager<M: Middleware> {
    inner: ClaimsManagerAbi<M>,
}

impl<M: Middleware> Deref for ClaimsManager<M> {
    type Target = ClaimsManagerAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> ClaimsManager<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: ClaimsManagerAbi::new(address, client) }
    }

    /// Whether `sp` has not yet claimed its share of the current round.
    pub async fn claim_pending(&self, sp: Address) -> Result<bool> {
        Ok(self.inner.claim_pending(sp).call().await?)
    }

    pub async fn funds_per_round(&self) -> Result<U256> {
        Ok(self.get_funds_per_round().call().await?)
    }

    pub async fn last_funded_block(&self) -> Result<U256> {
        Ok(self.get_last_funded_block().call().await?)
    }

    pub async fn total_claimed_in_round(&self) -> Result<U256> {
        Ok(self.get_total_claimed_in_round().call().await?)
    }

    pub async fn funding_round_block_diff(&self) -> Result<U256> {
        Ok(self.get_funding_round_block_diff().call().await?)
    }

    pub async fn recurring_community_funding_amount(&self) -> Result<U256> {
        Ok(self.get_recurring_community_funding_amount().call().await?)
    }

    pub async fn community_pool(&self) -> Result<Address> {
        Ok(self.get_community_pool_address().call().await?)
    }

    pub async fn round(&self) -> Result<FundingRound> {
        let last_funded_block = self.last_funded_block().await?;
        let funding_round_block_diff = self.funding_round_block_diff().await?;
        let (funds_per_round, total_claimed_in_round) =
            futures::try_join!(self.funds_per_round(), self.total_claimed_in_round())?;
        let (recurring_community_funding_amount, community_pool) = futures::try_join!(
            self.recurring_community_funding_amount(),
            self.community_pool()
        )?;
        Ok(FundingRound {
            address: self.address(),
            last_funded_block,
            funding_round_block_diff,
            funds_per_round,
            total_claimed_in_round,
            recurring_community_funding_amount,
            community_pool,
        })
    }

    /// Starts a new funding round. Reverts until [`FundingRound::can_initiate_at`] holds.
    pub async fn initiate_round(&self) -> Result<(TransactionReceipt, RoundInitiatedFilter)> {
        let receipt = send_and_confirm(self.inner.initiate_round(), "initiate round").await?;
        let initiated = find_event::<RoundInitiatedFilter>(&receipt)?;
        Ok((receipt, initiated))
    }

    pub async fn round_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(RoundInitiatedFilter, LogMeta)>> {
        let filter =
            Filter::new().address(self.address()).topic0(RoundInitiatedFilter::signature());
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    /// Processed claims, optionally of a single service provider.
    pub async fn claim_events(
        &self,
        claimer: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(ClaimProcessedFilter, LogMeta)>> {
        let filter =
            Filter::new().address(self.address()).topic0(ClaimProcessedFilter::signature());
        let filter = with_topics(filter, [claimer.map(address_topic), None, None]);
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{
        tests::{log_with, mined},
        uint_topic,
    };
    use ethers::{
        abi::{self, Token},
        providers::{MockProvider, Provider},
        types::Bytes,
    };

    fn manager() -> (ClaimsManager<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (ClaimsManager::new(Address::repeat_byte(0xc1), Arc::new(provider)), mock)
    }

    fn push_uint(mock: &MockProvider, value: U256) {
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Uint(value)]).into()).unwrap();
    }

    #[tokio::test]
    async fn test_claim_pending() {
        let (manager, mock) = manager();
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Bool(true)]).into()).unwrap();

        assert!(manager.claim_pending(Address::repeat_byte(0x0a)).await.unwrap());
    }

    #[tokio::test]
    async fn test_round_getters() {
        let (manager, mock) = manager();
        let wei = U256::exp10(18);
        push_uint(&mock, wei * 10_000u64);
        push_uint(&mock, U256::from(17_899_100u64));
        push_uint(&mock, wei * 1_000_000u64);

        assert_eq!(manager.funds_per_round().await.unwrap(), wei * 1_000_000u64);
        assert_eq!(manager.last_funded_block().await.unwrap(), U256::from(17_899_100u64));
        assert_eq!(manager.total_claimed_in_round().await.unwrap(), wei * 10_000u64);
    }

    #[tokio::test]
    async fn test_round() {
        let (manager, mock) = manager();
        let pool = Address::repeat_byte(0xcf);
        // Responses pop last-in first-out; joined calls are issued in argument order.
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Address(pool)]).into()).unwrap();
        push_uint(&mock, U256::zero());
        push_uint(&mock, U256::from(400));
        push_uint(&mock, U256::from(1_000));
        push_uint(&mock, U256::from(46_523));
        push_uint(&mock, U256::from(100));

        let round = manager.round().await.unwrap();
        assert_eq!(round.last_funded_block, U256::from(100));
        assert_eq!(round.funding_round_block_diff, U256::from(46_523));
        assert_eq!(round.funds_per_round, U256::from(1_000));
        assert_eq!(round.total_claimed_in_round, U256::from(400));
        assert_eq!(round.community_pool, pool);
        assert_eq!(round.unclaimed(), U256::from(600));
        assert_eq!(round.next_round_block(), U256::from(46_624));
        assert!(!round.can_initiate_at(46_623));
        assert!(round.can_initiate_at(46_624));
    }

    #[tokio::test]
    async fn test_round_events() {
        let (manager, mock) = manager();
        let initiated = mined(
            log_with(
                vec![
                    RoundInitiatedFilter::signature(),
                    uint_topic(U256::from(12)),
                    uint_topic(U256::from(3)),
                    uint_topic(U256::from(1_000)),
                ],
                vec![],
            ),
            12,
        );
        mock.push::<Vec<ethers::types::Log>, _>(vec![initiated]).unwrap();

        let rounds = manager.round_events(0, 20).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].0.round_number, U256::from(3));
        assert_eq!(rounds[0].0.fund_amount, U256::from(1_000));
    }

    #[tokio::test]
    async fn test_claim_events_filter_on_claimer() {
        let (manager, mock) = manager();
        let sp = Address::repeat_byte(0x0a);
        let claimed = mined(
            log_with(
                vec![
                    ClaimProcessedFilter::signature(),
                    address_topic(sp),
                    uint_topic(U256::from(25)),
                    uint_topic(U256::from(125)),
                ],
                vec![Token::Uint(U256::from(100))],
            ),
            14,
        );
        mock.push::<Vec<ethers::types::Log>, _>(vec![claimed]).unwrap();

        let claims = manager.claim_events(Some(sp), 10, 20).await.unwrap();
        assert_eq!(claims[0].0.claimer, sp);
        assert_eq!(claims[0].0.old_total, U256::from(100));
        assert_eq!(claims[0].0.new_total, U256::from(125));

        let filter = Filter::new()
            .address(manager.address())
            .topic0(ClaimProcessedFilter::signature())
            .topic1(address_topic(sp))
            .from_block(10u64)
            .to_block(20u64);
        mock.assert_request("eth_getLogs", [filter]).unwrap();
    }

    #[test]
    fn test_unclaimed_saturates() {
        let round = FundingRound {
            address: Address::zero(),
            last_funded_block: U256::zero(),
            funding_round_block_diff: U256::zero(),
            funds_per_round: U256::from(5),
            total_claimed_in_round: U256::from(7),
            recurring_community_funding_amount: U256::zero(),
            community_pool: Address::zero(),
        };
        assert_eq!(round.unclaimed(), U256::zero());
        assert!(round.can_initiate_at(1));
    }
}
