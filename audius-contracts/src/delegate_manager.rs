use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    contract::{EthEvent, LogMeta},
    providers::Middleware,
    types::{Address, Filter, TransactionReceipt, U256},
};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bindings::{
        delegate_manager::{
            ClaimFilter, IncreaseDelegatedStakeFilter, SlashFilter,
            UndelegateStakeRequestCancelledFilter, UndelegateStakeRequestEvaluatedFilter,
            UndelegateStakeRequestedFilter,
        },
        DelegateManagerAbi, DelegateManagerAbiEvents,
    },
    events::fetch_events_between,
    tx::{address_topic, send_and_confirm, with_topics},
};

const MAX_CONCURRENT_CALLS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingUndelegate {
    pub target: Address,
    pub amount: U256,
    pub lockup_expiry_block: U256,
}

impl PendingUndelegate {
    pub fn is_pending(&self) -> bool {
        !self.lockup_expiry_block.is_zero()
    }
}

impl From<(Address, U256, U256)> for PendingUndelegate {
    fn from((target, amount, lockup_expiry_block): (Address, U256, U256)) -> Self {
        Self { target, amount, lockup_expiry_block }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationParams {
    pub undelegate_lockup_duration: U256,
    pub max_delegators: U256,
    pub min_delegation_amount: U256,
    pub remove_delegator_lockup_duration: U256,
    pub remove_delegator_eval_duration: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStake {
    pub delegator: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationSummary {
    pub service_provider: Address,
    pub total_delegated: U256,
    pub total_locked: U256,
    pub delegators: Vec<DelegatorStake>,
}

impl DelegationSummary {
    /// Delegated stake that is not waiting on an undelegate lockup.
    pub fn active(&self) -> U256 {
        self.total_delegated.saturating_sub(self.total_locked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelegationEvent {
    Increased { delegator: Address, service_provider: Address, amount: U256 },
    UndelegateRequested {
        delegator: Address,
        service_provider: Address,
        amount: U256,
        lockup_expiry_block: U256,
    },
    UndelegateCancelled { delegator: Address, service_provider: Address, amount: U256 },
    UndelegateEvaluated { delegator: Address, service_provider: Address, amount: U256 },
}

impl DelegationEvent {
    fn from_manager_event(event: DelegateManagerAbiEvents) -> Option<Self> {
        use DelegateManagerAbiEvents as E;
        match event {
            E::IncreaseDelegatedStakeFilter(e) => Some(DelegationEvent::Increased {
                delegator: e.delegator,
                service_provider: e.service_provider,
                amount: e.increase_amount,
            }),
            E::UndelegateStakeRequestedFilter(e) => Some(DelegationEvent::UndelegateRequested {
                delegator: e.delegator,
                service_provider: e.service_provider,
                amount: e.amount,
                lockup_expiry_block: e.lockup_expiry_block,
            }),
            E::UndelegateStakeRequestCancelledFilter(e) => {
                Some(DelegationEvent::UndelegateCancelled {
                    delegator: e.delegator,
                    service_provider: e.service_provider,
                    amount: e.amount,
                })
            }
            E::UndelegateStakeRequestEvaluatedFilter(e) => {
                Some(DelegationEvent::UndelegateEvaluated {
                    delegator: e.delegator,
                    service_provider: e.service_provider,
                    amount: e.amount,
                })
            }
            _ => None,
        }
    }
}

/// DelegateManager wrapper: stake delegated by third parties to service providers, reward
/// claims and slashing.
#[derive(Clone, Debug)]
pub struct DelegateManager<M: Middleware> {
    inner: DelegateManagerAbi<M>,
}

impl<M: Middleware> Deref for DelegateManager<M> {
    type Target = DelegateManagerAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> DelegateManager<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: DelegateManagerAbi::new(address, client) }
    }

    pub async fn delegator_stake(&self, delegator: Address, sp: Address) -> Result<U256> {
        Ok(self.get_delegator_stake_for_service_provider(delegator, sp).call().await?)
    }

    pub async fn total_delegator_stake(&self, delegator: Address) -> Result<U256> {
        Ok(self.get_total_delegator_stake(delegator).call().await?)
    }

    pub async fn delegators_of(&self, sp: Address) -> Result<Vec<Address>> {
        Ok(self.get_delegators_list(sp).call().await?)
    }

    pub async fn total_delegated_to(&self, sp: Address) -> Result<U256> {
        Ok(self.get_total_delegated_to_service_provider(sp).call().await?)
    }

    pub async fn total_locked_delegation_for(&self, sp: Address) -> Result<U256> {
        Ok(self.get_total_locked_delegation_for_service_provider(sp).call().await?)
    }

    pub async fn pending_undelegate(&self, delegator: Address) -> Result<PendingUndelegate> {
        Ok(self.get_pending_undelegate_request(delegator).call().await?.into())
    }

    /// Lockup expiry block of a pending removal of `delegator` from `sp`, zero if none.
    pub async fn pending_remove_delegator(&self, sp: Address, delegator: Address) -> Result<U256> {
        Ok(self.get_pending_remove_delegator_request(sp, delegator).call().await?)
    }

    pub async fn sp_min_delegation_amount(&self, sp: Address) -> Result<U256> {
        Ok(self.get_sp_min_delegation_amount(sp).call().await?)
    }

    pub async fn delegation_params(&self) -> Result<DelegationParams> {
        let undelegate_lockup = self.get_undelegate_lockup_duration();
        let max = self.get_max_delegators();
        let min_delegation = self.get_min_delegation_amount();
        let remove_lockup = self.get_remove_delegator_lockup_duration();
        let remove_eval = self.get_remove_delegator_eval_duration();
        let (
            undelegate_lockup_duration,
            max_delegators,
            min_delegation_amount,
            remove_delegator_lockup_duration,
            remove_delegator_eval_duration,
        ) = futures::try_join!(
            undelegate_lockup.call(),
            max.call(),
            min_delegation.call(),
            remove_lockup.call(),
            remove_eval.call(),
        )?;
        Ok(DelegationParams {
            undelegate_lockup_duration,
            max_delegators,
            min_delegation_amount,
            remove_delegator_lockup_duration,
            remove_delegator_eval_duration,
        })
    }

    pub async fn delegation_summary(&self, sp: Address) -> Result<DelegationSummary> {
        let (delegators, total_delegated, total_locked) = futures::try_join!(
            self.delegators_of(sp),
            self.total_delegated_to(sp),
            self.total_locked_delegation_for(sp),
        )?;
        debug!("{sp:?} has {} delegators", delegators.len());

        let delegators: Vec<DelegatorStake> = stream::iter(delegators)
            .map(|delegator| async move {
                let amount = self.delegator_stake(delegator, sp).await?;
                Ok::<_, audius_error::AudiusError>(DelegatorStake { delegator, amount })
            })
            .buffered(MAX_CONCURRENT_CALLS)
            .try_collect()
            .await?;

        Ok(DelegationSummary { service_provider: sp, total_delegated, total_locked, delegators })
    }

    pub async fn delegate_stake(&self, sp: Address, amount: U256) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.delegate_stake(sp, amount), "delegate stake").await
    }

    pub async fn request_undelegate_stake(
        &self,
        sp: Address,
        amount: U256,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.request_undelegate_stake(sp, amount), "request undelegate")
            .await
    }

    pub async fn cancel_undelegate_stake(&self) -> Result<TransactionReceipt> {
        send_and_confirm(self.cancel_undelegate_stake_request(), "cancel undelegate").await
    }

    pub async fn undelegate_stake(&self) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.undelegate_stake(), "undelegate stake").await
    }

    pub async fn claim_rewards(&self, sp: Address) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.claim_rewards(sp), "claim rewards").await
    }

    pub async fn request_remove_delegator(
        &self,
        sp: Address,
        delegator: Address,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.request_remove_delegator(sp, delegator), "request remove")
            .await
    }

    pub async fn remove_delegator(
        &self,
        sp: Address,
        delegator: Address,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.remove_delegator(sp, delegator), "remove delegator").await
    }

    /// Delegation increases and undelegate requests, cancellations and evaluations, narrowed to a
    /// delegator, a service provider or both.
    pub async fn delegation_events(
        &self,
        delegator: Option<Address>,
        sp: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(DelegationEvent, LogMeta)>> {
        let filter = Filter::new().address(self.address()).events([
            IncreaseDelegatedStakeFilter::abi_signature().into_owned(),
            UndelegateStakeRequestedFilter::abi_signature().into_owned(),
            UndelegateStakeRequestCancelledFilter::abi_signature().into_owned(),
            UndelegateStakeRequestEvaluatedFilter::abi_signature().into_owned(),
        ]);
        let filter =
            with_topics(filter, [delegator.map(address_topic), sp.map(address_topic), None]);
        let events: Vec<(DelegateManagerAbiEvents, LogMeta)> =
            fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await?;
        Ok(events
            .into_iter()
            .filter_map(|(event, meta)| Some((DelegationEvent::from_manager_event(event)?, meta)))
            .collect())
    }

    pub async fn claim_events(
        &self,
        claimer: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(ClaimFilter, LogMeta)>> {
        let filter = Filter::new().address(self.address()).topic0(ClaimFilter::signature());
        let filter = with_topics(filter, [claimer.map(address_topic), None, None]);
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    pub async fn slash_events(
        &self,
        target: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(SlashFilter, LogMeta)>> {
        let filter = Filter::new().address(self.address()).topic0(SlashFilter::signature());
        let filter = with_topics(filter, [target.map(address_topic), None, None]);
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::tests::{log_with, mined};
    use ethers::{
        abi::{self, Token},
        providers::{MockProvider, Provider},
        types::Bytes,
    };

    fn manager() -> (DelegateManager<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (DelegateManager::new(Address::repeat_byte(0x03), Arc::new(provider)), mock)
    }

    fn encode(tokens: Vec<Token>) -> Bytes {
        abi::encode(&tokens).into()
    }

    #[tokio::test]
    async fn test_pending_undelegate_decoding() {
        let (manager, mock) = manager();
        let sp = Address::repeat_byte(0x0a);
        mock.push::<Bytes, _>(encode(vec![
            Token::Address(sp),
            Token::Uint(U256::from(1_000)),
            Token::Uint(U256::from(20_000_000u64)),
        ]))
        .unwrap();

        let pending = manager.pending_undelegate(Address::repeat_byte(0x0b)).await.unwrap();
        assert!(pending.is_pending());
        assert_eq!(pending.target, sp);
        assert_eq!(pending.amount, U256::from(1_000));
        assert!(!PendingUndelegate::default().is_pending());
    }

    #[tokio::test]
    async fn test_delegators_of() {
        let (manager, mock) = manager();
        let delegators = vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)];
        mock.push::<Bytes, _>(encode(vec![Token::Array(
            delegators.iter().copied().map(Token::Address).collect(),
        )]))
        .unwrap();

        assert_eq!(manager.delegators_of(Address::repeat_byte(0x0a)).await.unwrap(), delegators);
    }

    #[tokio::test]
    async fn test_claim_events() {
        let (manager, mock) = manager();
        let claimer = Address::repeat_byte(0x0c);
        // Every argument of Claim is indexed, so the data section is empty.
        let log = mined(
            log_with(
                vec![
                    ClaimFilter::signature(),
                    address_topic(claimer),
                    crate::tx::uint_topic(U256::from(77)),
                    crate::tx::uint_topic(U256::from(1_077)),
                ],
                vec![],
            ),
            12,
        );
        mock.push::<Vec<ethers::types::Log>, _>(vec![log]).unwrap();

        let claims = manager.claim_events(Some(claimer), 0, 100).await.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].0.claimer, claimer);
        assert_eq!(claims[0].0.rewards, U256::from(77));
        assert_eq!(claims[0].0.new_total, U256::from(1_077));
    }

    #[test]
    fn test_delegation_event_mapping() {
        let event = DelegateManagerAbiEvents::UndelegateStakeRequestedFilter(
            UndelegateStakeRequestedFilter {
                delegator: Address::repeat_byte(0x01),
                service_provider: Address::repeat_byte(0x02),
                amount: U256::from(3),
                lockup_expiry_block: U256::from(4),
            },
        );
        assert_eq!(
            DelegationEvent::from_manager_event(event),
            Some(DelegationEvent::UndelegateRequested {
                delegator: Address::repeat_byte(0x01),
                service_provider: Address::repeat_byte(0x02),
                amount: U256::from(3),
                lockup_expiry_block: U256::from(4),
            })
        );

        let unrelated = DelegateManagerAbiEvents::MaxDelegatorsUpdatedFilter(
            crate::bindings::delegate_manager::MaxDelegatorsUpdatedFilter {
                max_delegators: U256::from(175),
            },
        );
        assert_eq!(DelegationEvent::from_manager_event(unrelated), None);
    }

    #[test]
    fn test_active_delegation() {
        let summary = DelegationSummary {
            service_provider: Address::zero(),
            total_delegated: U256::from(100),
            total_locked: U256::from(30),
            delegators: vec![],
        };
        assert_eq!(summary.active(), U256::from(70));
    }
}
