use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    contract::LogMeta,
    providers::Middleware,
    types::{Address, Filter, U256},
};
use serde::{Deserialize, Serialize};

use crate::{
    bindings::{StakingAbi, StakingAbiEvents},
    events::fetch_events_between,
    tx::{address_topic, with_topics},
};

/// Stake position of one account, optionally at a past block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStake {
    pub account: Address,
    pub total_staked: U256,
    pub is_staker: bool,
    pub last_staked_block: U256,
    pub last_claimed_block: U256,
    pub at_block: Option<u64>,
}

/// Staking wrapper. Staking holds every token staked in the protocol, both the deployer's own
/// stake and delegated stake, with a checkpointed history per account.
#[derive(Clone, Debug)]
pub struct Staking<M: Middleware> {
    inner: StakingAbi<M>,
}

impl<M: Middleware> Deref for Staking<M> {
    type Target = StakingAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> Staking<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: StakingAbi::new(address, client) }
    }

    pub async fn total_staked(&self) -> Result<U256> {
        Ok(self.inner.total_staked().call().await?)
    }

    pub async fn total_staked_at(&self, block: u64) -> Result<U256> {
        Ok(self.inner.total_staked_at(U256::from(block)).call().await?)
    }

    pub async fn total_staked_for(&self, account: Address) -> Result<U256> {
        Ok(self.inner.total_staked_for(account).call().await?)
    }

    pub async fn total_staked_for_at(&self, account: Address, block: u64) -> Result<U256> {
        Ok(self.inner.total_staked_for_at(account, U256::from(block)).call().await?)
    }

    pub async fn is_staker(&self, account: Address) -> Result<bool> {
        Ok(self.inner.is_staker(account).call().await?)
    }

    pub async fn last_staked_for(&self, account: Address) -> Result<U256> {
        Ok(self.inner.last_staked_for(account).call().await?)
    }

    pub async fn last_claimed_for(&self, account: Address) -> Result<U256> {
        Ok(self.inner.last_claimed_for(account).call().await?)
    }

    pub async fn account_stake(
        &self,
        account: Address,
        at_block: Option<u64>,
    ) -> Result<AccountStake> {
        let total_staked = async {
            match at_block {
                Some(block) => self.total_staked_for_at(account, block).await,
                None => self.total_staked_for(account).await,
            }
        };
        let (total_staked, is_staker, last_staked_block, last_claimed_block) = futures::try_join!(
            total_staked,
            self.is_staker(account),
            self.last_staked_for(account),
            self.last_claimed_for(account),
        )?;
        Ok(AccountStake {
            account,
            total_staked,
            is_staker,
            last_staked_block,
            last_claimed_block,
            at_block,
        })
    }

    /// Staked, unstaked and slashed events, optionally for a single account, in chain order.
    pub async fn staking_events(
        &self,
        account: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(StakingAbiEvents, LogMeta)>> {
        let filter = with_topics(
            Filter::new().address(self.address()),
            [account.map(address_topic), None, None],
        );
        let mut events: Vec<(StakingAbiEvents, LogMeta)> =
            fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await?;
        events.sort_by_key(|(_, meta)| (meta.block_number, meta.log_index));
        Ok(events)
    }
}
