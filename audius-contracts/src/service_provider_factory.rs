use std::{ops::Deref, sync::Arc};

use audius_error::{AudiusError, Result};
use ethers::{
    contract::{EthEvent, LogMeta},
    providers::Middleware,
    types::{Address, Filter, TransactionReceipt, H256, U256},
};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::{Host, Url};

use crate::{
    bindings::{
        service_provider_factory::{
            DecreaseStakeRequestCancelledFilter, DecreaseStakeRequestEvaluatedFilter,
            DecreaseStakeRequestedFilter, DelegateOwnerWalletUpdatedFilter,
            DeregisteredServiceProviderFilter, EndpointUpdatedFilter, IncreasedStakeFilter,
            RegisteredServiceProviderFilter,
        },
        ServiceProviderFactoryAbi, ServiceProviderFactoryAbiEvents,
    },
    events::{fetch_events_between, head_block},
    service_type::ServiceType,
    tx::{address_topic, bytes32_topic, find_event, send_and_confirm, uint_topic, with_topics},
};

/// Upper bound on concurrent `eth_call`s when walking every slot of a service type.
const MAX_CONCURRENT_CALLS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderDetails {
    pub deployer_stake: U256,
    pub deployer_cut: U256,
    pub valid_bounds: bool,
    pub number_of_endpoints: U256,
    pub min_account_stake: U256,
    pub max_account_stake: U256,
}

impl From<(U256, U256, bool, U256, U256, U256)> for ServiceProviderDetails {
    fn from(value: (U256, U256, bool, U256, U256, U256)) -> Self {
        let (
            deployer_stake,
            deployer_cut,
            valid_bounds,
            number_of_endpoints,
            min_account_stake,
            max_account_stake,
        ) = value;
        Self {
            deployer_stake,
            deployer_cut,
            valid_bounds,
            number_of_endpoints,
            min_account_stake,
            max_account_stake,
        }
    }
}

/// One registered endpoint slot. Deregistered slots keep their id but have an empty endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub sp_id: U256,
    pub service_type: ServiceType,
    pub owner: Address,
    pub endpoint: String,
    pub block_number: U256,
    pub delegate_owner_wallet: Address,
}

impl ServiceEndpoint {
    pub fn is_registered(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

/// A lockup-gated request: a stake decrease or a deployer cut change. `value` is the requested
/// amount or the new cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingRequest {
    pub value: U256,
    pub lockup_expiry_block: U256,
}

impl PendingRequest {
    pub fn is_pending(&self) -> bool {
        !self.lockup_expiry_block.is_zero()
    }

    pub fn can_evaluate_at(&self, block: u64) -> bool {
        self.is_pending() && self.lockup_expiry_block <= U256::from(block)
    }
}

impl From<(U256, U256)> for PendingRequest {
    fn from((value, lockup_expiry_block): (U256, U256)) -> Self {
        Self { value, lockup_expiry_block }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupDurations {
    pub decrease_stake: U256,
    pub deployer_cut: U256,
}

/// Outcome of a `register` or `deregister` call, read back from the emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderRegistration {
    pub sp_id: U256,
    pub service_type: ServiceType,
    pub owner: Address,
    pub endpoint: String,
    /// Stake added on register, stake released on deregister.
    pub stake_amount: U256,
}

impl TryFrom<RegisteredServiceProviderFilter> for ServiceProviderRegistration {
    type Error = audius_error::AudiusError;

    fn try_from(event: RegisteredServiceProviderFilter) -> Result<Self> {
        Ok(Self {
            sp_id: event.sp_id,
            service_type: ServiceType::from_bytes32(event.service_type)?,
            owner: event.owner,
            endpoint: event.endpoint,
            stake_amount: event.stake_amount,
        })
    }
}

impl TryFrom<DeregisteredServiceProviderFilter> for ServiceProviderRegistration {
    type Error = audius_error::AudiusError;

    fn try_from(event: DeregisteredServiceProviderFilter) -> Result<Self> {
        Ok(Self {
            sp_id: event.sp_id,
            service_type: ServiceType::from_bytes32(event.service_type)?,
            owner: event.owner,
            endpoint: event.endpoint,
            stake_amount: event.unstake_amount,
        })
    }
}

/// Indexed arguments shared by the registration events. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointEventFilter {
    pub sp_id: Option<U256>,
    pub service_type: Option<ServiceType>,
    pub owner: Option<Address>,
}

impl EndpointEventFilter {
    pub fn slot(service_type: &ServiceType, sp_id: U256) -> Self {
        Self { sp_id: Some(sp_id), service_type: Some(service_type.clone()), owner: None }
    }

    fn topics(&self) -> Result<(Option<H256>, Option<H256>, Option<H256>)> {
        let service_type =
            self.service_type.as_ref().map(ServiceType::to_bytes32).transpose()?.map(bytes32_topic);
        Ok((self.sp_id.map(uint_topic), service_type, self.owner.map(address_topic)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StakeEvent {
    Increased { owner: Address, amount: U256, new_stake: U256 },
    DecreaseRequested { owner: Address, amount: U256, lockup_expiry_block: U256 },
    DecreaseEvaluated { owner: Address, amount: U256, new_stake: U256 },
    DecreaseCancelled { owner: Address, amount: U256, lockup_expiry_block: U256 },
}

impl StakeEvent {
    fn from_factory_event(event: ServiceProviderFactoryAbiEvents) -> Option<Self> {
        use ServiceProviderFactoryAbiEvents as E;
        match event {
            E::IncreasedStakeFilter(e) => Some(StakeEvent::Increased {
                owner: e.owner,
                amount: e.increase_amount,
                new_stake: e.new_stake_amount,
            }),
            E::DecreaseStakeRequestedFilter(e) => Some(StakeEvent::DecreaseRequested {
                owner: e.owner,
                amount: e.decrease_amount,
                lockup_expiry_block: e.lockup_expiry_block,
            }),
            E::DecreaseStakeRequestEvaluatedFilter(e) => Some(StakeEvent::DecreaseEvaluated {
                owner: e.owner,
                amount: e.decrease_amount,
                new_stake: e.new_stake_amount,
            }),
            E::DecreaseStakeRequestCancelledFilter(e) => Some(StakeEvent::DecreaseCancelled {
                owner: e.owner,
                amount: e.decrease_amount,
                lockup_expiry_block: e.lockup_expiry_block,
            }),
            _ => None,
        }
    }
}

/// Last known state of an endpoint slot, rebuilt from the factory's event history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisteredService {
    pub endpoint: String,
    pub owner: Option<Address>,
    pub delegate_owner_wallet: Option<Address>,
}

/// ServiceProviderFactory wrapper. Owns endpoint registration and the deployer's own stake.
/// Dereferences to the generated binding for anything not wrapped here.
#[derive(Clone, Debug)]
pub struct ServiceProviderFactory<M: Middleware> {
    inner: ServiceProviderFactoryAbi<M>,
}

impl<M: Middleware> Deref for ServiceProviderFactory<M> {
    type Target = ServiceProviderFactoryAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> ServiceProviderFactory<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: ServiceProviderFactoryAbi::new(address, client) }
    }

    pub async fn service_provider_details(&self, sp: Address) -> Result<ServiceProviderDetails> {
        Ok(self.get_service_provider_details(sp).call().await?.into())
    }

    pub async fn service_endpoint(
        &self,
        service_type: &ServiceType,
        sp_id: U256,
    ) -> Result<ServiceEndpoint> {
        let (owner, endpoint, block_number, delegate_owner_wallet) =
            self.get_service_endpoint_info(service_type.to_bytes32()?, sp_id).call().await?;
        Ok(ServiceEndpoint {
            sp_id,
            service_type: service_type.clone(),
            owner,
            endpoint: sanitize_endpoint(&endpoint).to_owned(),
            block_number,
            delegate_owner_wallet,
        })
    }

    pub async fn total_providers(&self, service_type: &ServiceType) -> Result<U256> {
        Ok(self.get_total_service_type_providers(service_type.to_bytes32()?).call().await?)
    }

    /// Every registered endpoint of `service_type`. Slots are numbered from 1 and deregistered
    /// slots are skipped.
    pub async fn list_service_providers(
        &self,
        service_type: &ServiceType,
    ) -> Result<Vec<ServiceEndpoint>> {
        let total = self.total_providers(service_type).await?;
        let total = u64::try_from(total).map_err(|_| AudiusError::CountOverflow {
            what: "service provider",
            value: total.to_string(),
        })?;
        debug!("Walking {total} {service_type} slots");

        let slots: Vec<ServiceEndpoint> = stream::iter(1..=total)
            .map(|id| self.service_endpoint(service_type, U256::from(id)))
            .buffered(MAX_CONCURRENT_CALLS)
            .try_collect()
            .await?;
        Ok(slots.into_iter().filter(ServiceEndpoint::is_registered).collect())
    }

    pub async fn ids_for_owner(
        &self,
        owner: Address,
        service_type: &ServiceType,
    ) -> Result<Vec<U256>> {
        Ok(self
            .get_service_provider_ids_from_address(owner, service_type.to_bytes32()?)
            .call()
            .await?)
    }

    pub async fn id_for_endpoint(&self, endpoint: &str) -> Result<U256> {
        Ok(self
            .get_service_provider_id_from_endpoint(sanitize_endpoint(endpoint).to_owned())
            .call()
            .await?)
    }

    pub async fn pending_decrease_stake(&self, sp: Address) -> Result<PendingRequest> {
        Ok(self.get_pending_decrease_stake_request(sp).call().await?.into())
    }

    pub async fn pending_deployer_cut(&self, sp: Address) -> Result<PendingRequest> {
        Ok(self.get_pending_update_deployer_cut_request(sp).call().await?.into())
    }

    pub async fn lockup_durations(&self) -> Result<LockupDurations> {
        let decrease_stake = self.get_decrease_stake_lockup_duration();
        let deployer_cut = self.get_deployer_cut_lockup_duration();
        let (decrease_stake, deployer_cut) =
            futures::try_join!(decrease_stake.call(), deployer_cut.call())?;
        Ok(LockupDurations { decrease_stake, deployer_cut })
    }

    /// Registers `endpoint` and stakes `stake_amount`. The staking contract must already hold an
    /// allowance for the amount. See [`validate_endpoint`] for the accepted endpoints.
    pub async fn register(
        &self,
        service_type: &ServiceType,
        endpoint: &str,
        stake_amount: U256,
        delegate_owner_wallet: Address,
    ) -> Result<(TransactionReceipt, ServiceProviderRegistration)> {
        let endpoint = validate_endpoint(endpoint)?;
        let call = self.inner.register(
            service_type.to_bytes32()?,
            endpoint.to_owned(),
            stake_amount,
            delegate_owner_wallet,
        );
        let receipt = send_and_confirm(call, "register").await?;
        let registration = find_event::<RegisteredServiceProviderFilter>(&receipt)?.try_into()?;
        Ok((receipt, registration))
    }

    pub async fn deregister(
        &self,
        service_type: &ServiceType,
        endpoint: &str,
    ) -> Result<(TransactionReceipt, ServiceProviderRegistration)> {
        let call = self
            .inner
            .deregister(service_type.to_bytes32()?, sanitize_endpoint(endpoint).to_owned());
        let receipt = send_and_confirm(call, "deregister").await?;
        let registration =
            find_event::<DeregisteredServiceProviderFilter>(&receipt)?.try_into()?;
        Ok((receipt, registration))
    }

    pub async fn increase_stake(&self, amount: U256) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.increase_stake(amount), "increase stake").await
    }

    pub async fn request_decrease_stake(&self, amount: U256) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.request_decrease_stake(amount), "request decrease stake").await
    }

    pub async fn cancel_decrease_stake(&self, account: Address) -> Result<TransactionReceipt> {
        send_and_confirm(self.cancel_decrease_stake_request(account), "cancel decrease stake").await
    }

    pub async fn decrease_stake(&self) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.decrease_stake(), "decrease stake").await
    }

    pub async fn update_endpoint(
        &self,
        service_type: &ServiceType,
        old_endpoint: &str,
        new_endpoint: &str,
    ) -> Result<TransactionReceipt> {
        let call = self.inner.update_endpoint(
            service_type.to_bytes32()?,
            sanitize_endpoint(old_endpoint).to_owned(),
            validate_endpoint(new_endpoint)?.to_owned(),
        );
        send_and_confirm(call, "update endpoint").await
    }

    pub async fn update_delegate_owner_wallet(
        &self,
        service_type: &ServiceType,
        endpoint: &str,
        wallet: Address,
    ) -> Result<TransactionReceipt> {
        let call = self.inner.update_delegate_owner_wallet(
            service_type.to_bytes32()?,
            sanitize_endpoint(endpoint).to_owned(),
            wallet,
        );
        send_and_confirm(call, "update delegate owner wallet").await
    }

    pub async fn request_update_deployer_cut(
        &self,
        sp: Address,
        cut: U256,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.request_update_deployer_cut(sp, cut), "request deployer cut")
            .await
    }

    pub async fn update_deployer_cut(&self, sp: Address) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.update_deployer_cut(sp), "update deployer cut").await
    }

    fn event_filter<E: EthEvent>(&self) -> Filter {
        Filter::new().address(self.address()).topic0(E::signature())
    }

    pub async fn registered_events(
        &self,
        filter: &EndpointEventFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(RegisteredServiceProviderFilter, LogMeta)>> {
        let (sp_id, service_type, owner) = filter.topics()?;
        let filter = with_topics(
            self.event_filter::<RegisteredServiceProviderFilter>(),
            [sp_id, service_type, owner],
        );
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    pub async fn deregistered_events(
        &self,
        filter: &EndpointEventFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(DeregisteredServiceProviderFilter, LogMeta)>> {
        let (sp_id, service_type, owner) = filter.topics()?;
        let filter = with_topics(
            self.event_filter::<DeregisteredServiceProviderFilter>(),
            [sp_id, service_type, owner],
        );
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    pub async fn endpoint_updated_events(
        &self,
        filter: &EndpointEventFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(EndpointUpdatedFilter, LogMeta)>> {
        let (sp_id, service_type, owner) = filter.topics()?;
        let filter = with_topics(
            self.event_filter::<EndpointUpdatedFilter>(),
            [service_type, owner, sp_id],
        );
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    pub async fn delegate_wallet_events(
        &self,
        filter: &EndpointEventFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(DelegateOwnerWalletUpdatedFilter, LogMeta)>> {
        let (sp_id, service_type, owner) = filter.topics()?;
        let filter = with_topics(
            self.event_filter::<DelegateOwnerWalletUpdatedFilter>(),
            [owner, service_type, sp_id],
        );
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }

    /// Stake increases and decrease requests, evaluations and cancellations of `owner`.
    pub async fn stake_events(
        &self,
        owner: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(StakeEvent, LogMeta)>> {
        let filter = Filter::new().address(self.address()).events([
            IncreasedStakeFilter::abi_signature().into_owned(),
            DecreaseStakeRequestedFilter::abi_signature().into_owned(),
            DecreaseStakeRequestEvaluatedFilter::abi_signature().into_owned(),
            DecreaseStakeRequestCancelledFilter::abi_signature().into_owned(),
        ]);
        let filter = with_topics(filter, [owner.map(address_topic), None, None]);
        let events: Vec<(ServiceProviderFactoryAbiEvents, LogMeta)> =
            fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await?;
        Ok(events
            .into_iter()
            .filter_map(|(event, meta)| Some((StakeEvent::from_factory_event(event)?, meta)))
            .collect())
    }

    /// Rebuilds the last endpoint, owner and delegate wallet of a slot that may since have been
    /// deregistered, from registration, endpoint and wallet update events.
    pub async fn deregistered_service(
        &self,
        service_type: &ServiceType,
        sp_id: U256,
        from_block: u64,
    ) -> Result<DeregisteredService> {
        let head = head_block(self.client().as_ref()).await?;
        let slot = EndpointEventFilter::slot(service_type, sp_id);
        let (registered, updated, wallets) = futures::try_join!(
            self.registered_events(&slot, from_block, head),
            self.endpoint_updated_events(&slot, from_block, head),
            self.delegate_wallet_events(&slot, from_block, head),
        )?;
        Ok(rebuild_service(
            registered.into_iter().map(|(e, _)| e),
            updated.into_iter().map(|(e, _)| e),
            wallets.into_iter().map(|(e, _)| e),
        ))
    }
}

fn rebuild_service(
    registered: impl Iterator<Item = RegisteredServiceProviderFilter>,
    updated: impl Iterator<Item = EndpointUpdatedFilter>,
    wallets: impl Iterator<Item = DelegateOwnerWalletUpdatedFilter>,
) -> DeregisteredService {
    let mut service = DeregisteredService::default();
    if let Some(last) = registered.last() {
        service.endpoint = last.endpoint;
        service.owner = Some(last.owner);
    }
    if let Some(last) = updated.last() {
        service.endpoint = last.new_endpoint;
    }
    if let Some(last) = wallets.last() {
        service.delegate_owner_wallet = Some(last.updated_wallet);
    }
    service
}

/// Endpoints are registered without a trailing slash.
pub fn sanitize_endpoint(endpoint: &str) -> &str {
    endpoint.strip_suffix('/').unwrap_or(endpoint)
}

/// New endpoints must be https urls on a fully qualified domain. Returns the sanitized endpoint.
pub fn validate_endpoint(endpoint: &str) -> Result<&str> {
    let invalid = |reason: &'static str| AudiusError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|_| invalid("not a url"))?;
    if url.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    match url.host() {
        Some(Host::Domain(domain)) if is_qualified_domain(domain) => {
            Ok(sanitize_endpoint(endpoint))
        }
        _ => Err(invalid("host must be a fully qualified domain name")),
    }
}

fn is_qualified_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.strip_suffix('.').unwrap_or(domain).split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };
    labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
        && tld.len() >= 2
        && tld.starts_with(|c: char| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        abi::{self, Token},
        providers::{MockProvider, Provider},
        types::Bytes,
    };

    fn factory() -> (ServiceProviderFactory<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (ServiceProviderFactory::new(Address::repeat_byte(0x02), Arc::new(provider)), mock)
    }

    fn encode(tokens: Vec<Token>) -> Bytes {
        abi::encode(&tokens).into()
    }

    #[test]
    fn test_sanitize_endpoint() {
        assert_eq!(sanitize_endpoint("https://dn1.audius.co/"), "https://dn1.audius.co");
        assert_eq!(sanitize_endpoint("https://dn1.audius.co"), "https://dn1.audius.co");
        assert_eq!(sanitize_endpoint(""), "");
    }

    #[test]
    fn test_validate_endpoint() {
        assert_eq!(validate_endpoint("https://dn1.audius.co/").unwrap(), "https://dn1.audius.co");
        assert_eq!(
            validate_endpoint("https://creatornode2.audius.co/path").unwrap(),
            "https://creatornode2.audius.co/path"
        );
        for endpoint in [
            "http://dn1.audius.co",
            "https://localhost",
            "https://127.0.0.1",
            "https://[::1]:4000",
            "https://audius.3",
            "dn1.audius.co",
            "",
        ] {
            assert!(
                matches!(validate_endpoint(endpoint), Err(AudiusError::InvalidEndpoint { .. })),
                "{endpoint} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_list_service_providers_count_overflow() {
        let (spf, mock) = factory();
        mock.push::<Bytes, _>(encode(vec![Token::Uint(U256::MAX)])).unwrap();

        assert!(matches!(
            spf.list_service_providers(&ServiceType::ContentNode).await,
            Err(AudiusError::CountOverflow { what: "service provider", .. })
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_endpoint_before_sending() {
        let (spf, mock) = factory();
        let dn = ServiceType::DiscoveryNode;
        let err =
            spf.register(&dn, "http://dn1.audius.co", U256::one(), Address::zero()).await.unwrap_err();
        assert!(matches!(err, AudiusError::InvalidEndpoint { reason: "scheme must be https", .. }));
        assert!(mock.assert_request("eth_sendTransaction", ()).is_err());
    }

    #[tokio::test]
    async fn test_service_endpoint_decoding() {
        let (spf, mock) = factory();
        let owner = Address::repeat_byte(0x0a);
        let wallet = Address::repeat_byte(0x0b);
        mock.push::<Bytes, _>(encode(vec![
            Token::Address(owner),
            Token::String("https://creatornode.audius.co/".into()),
            Token::Uint(U256::from(11_000_000u64)),
            Token::Address(wallet),
        ]))
        .unwrap();

        let endpoint = spf.service_endpoint(&ServiceType::ContentNode, U256::from(4)).await.unwrap();
        assert_eq!(endpoint.endpoint, "https://creatornode.audius.co");
        assert_eq!(endpoint.owner, owner);
        assert_eq!(endpoint.delegate_owner_wallet, wallet);
        assert_eq!(endpoint.sp_id, U256::from(4));
        assert_eq!(endpoint.service_type, ServiceType::ContentNode);
        assert!(endpoint.is_registered());
    }

    #[tokio::test]
    async fn test_service_provider_details_decoding() {
        let (spf, mock) = factory();
        let wei = U256::exp10(18);
        mock.push::<Bytes, _>(encode(vec![
            Token::Uint(wei * 200_000),
            Token::Uint(U256::from(10)),
            Token::Bool(true),
            Token::Uint(U256::from(2)),
            Token::Uint(wei * 200_000),
            Token::Uint(wei * 15_000_000),
        ]))
        .unwrap();

        let details = spf.service_provider_details(Address::repeat_byte(0x0a)).await.unwrap();
        assert!(details.valid_bounds);
        assert_eq!(details.number_of_endpoints, U256::from(2));
        assert_eq!(details.deployer_cut, U256::from(10));
        assert_eq!(details.max_account_stake, wei * 15_000_000);
    }

    #[tokio::test]
    async fn test_pending_decrease_stake() {
        let (spf, mock) = factory();
        mock.push::<Bytes, _>(encode(vec![Token::Uint(U256::from(500)), Token::Uint(U256::from(1_000))]))
            .unwrap();

        let pending = spf.pending_decrease_stake(Address::repeat_byte(0x0a)).await.unwrap();
        assert!(pending.is_pending());
        assert_eq!(pending.value, U256::from(500));
        assert!(!pending.can_evaluate_at(999));
        assert!(pending.can_evaluate_at(1_000));
        assert!(!PendingRequest::default().is_pending());
    }

    #[test]
    fn test_rebuild_deregistered_service() {
        let owner = Address::repeat_byte(0x0a);
        let service_type = ServiceType::DiscoveryNode.to_bytes32().unwrap();
        let registered = RegisteredServiceProviderFilter {
            sp_id: U256::from(3),
            service_type,
            owner,
            endpoint: "https://old.audius.co".into(),
            stake_amount: U256::from(1),
        };
        let updated = EndpointUpdatedFilter {
            service_type,
            owner,
            old_endpoint: "https://old.audius.co".into(),
            new_endpoint: "https://new.audius.co".into(),
            sp_id: U256::from(3),
        };
        let wallet = DelegateOwnerWalletUpdatedFilter {
            owner,
            service_type,
            sp_id: U256::from(3),
            updated_wallet: Address::repeat_byte(0x0d),
        };

        let service = rebuild_service(
            vec![registered.clone()].into_iter(),
            vec![updated].into_iter(),
            vec![wallet].into_iter(),
        );
        assert_eq!(service.endpoint, "https://new.audius.co");
        assert_eq!(service.owner, Some(owner));
        assert_eq!(service.delegate_owner_wallet, Some(Address::repeat_byte(0x0d)));

        let service =
            rebuild_service(vec![registered].into_iter(), std::iter::empty(), std::iter::empty());
        assert_eq!(service.endpoint, "https://old.audius.co");
        assert_eq!(service.delegate_owner_wallet, None);
    }

    #[test]
    fn test_registration_from_event() {
        let event = DeregisteredServiceProviderFilter {
            sp_id: U256::from(9),
            service_type: ServiceType::Validator.to_bytes32().unwrap(),
            owner: Address::repeat_byte(0x0a),
            endpoint: "https://validator.audius.co".into(),
            unstake_amount: U256::from(42),
        };
        let registration = ServiceProviderRegistration::try_from(event).unwrap();
        assert_eq!(registration.service_type, ServiceType::Validator);
        assert_eq!(registration.stake_amount, U256::from(42));
    }

    #[test]
    fn test_stake_event_mapping() {
        let event = ServiceProviderFactoryAbiEvents::IncreasedStakeFilter(IncreasedStakeFilter {
            owner: Address::repeat_byte(0x0a),
            increase_amount: U256::from(5),
            new_stake_amount: U256::from(15),
        });
        assert_eq!(
            StakeEvent::from_factory_event(event),
            Some(StakeEvent::Increased {
                owner: Address::repeat_byte(0x0a),
                amount: U256::from(5),
                new_stake: U256::from(15),
            })
        );
    }

    #[test]
    fn test_slot_filter_topics() {
        let slot = EndpointEventFilter::slot(&ServiceType::ContentNode, U256::from(7));
        let (sp_id, service_type, owner) = slot.topics().unwrap();
        assert_eq!(sp_id, Some(uint_topic(U256::from(7))));
        assert_eq!(
            service_type,
            Some(bytes32_topic(ServiceType::ContentNode.to_bytes32().unwrap()))
        );
        assert_eq!(owner, None);
    }
}
