use std::{collections::BTreeMap, sync::Arc};

use audius_error::{AudiusError, Result};
use ethers::{
    providers::Middleware,
    types::{Address, TransactionReceipt, U256},
};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::{
    claims_manager::ClaimsManager,
    delegate_manager::DelegateManager,
    entity_manager::EntityManager,
    events::{EventSource, WatchTarget},
    governance::Governance,
    key::ContractKey,
    network::Network,
    registry::Registry,
    rewards_manager::EthRewardsManager,
    service_provider_factory::{
        validate_endpoint, ServiceProviderFactory, ServiceProviderRegistration,
    },
    service_type::ServiceType,
    service_type_manager::ServiceTypeManager,
    staking::Staking,
    token::AudiusToken,
};

/// Addresses of every Audius contract as resolved at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub registry: Address,
    pub token: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_manager: Option<Address>,
    pub contracts: BTreeMap<ContractKey, Address>,
    pub unregistered: Vec<ContractKey>,
}

/// Entry point to the protocol. Holds one client and hands out typed wrappers for every contract,
/// resolving addresses through the Registry on first use.
#[derive(Debug)]
pub struct AudiusContracts<M: Middleware> {
    client: Arc<M>,
    registry: Registry<M>,
    token: Address,
    entity_manager: Option<Address>,
}

impl<M: Middleware + 'static> AudiusContracts<M> {
    pub fn new(client: Arc<M>, registry: Address, token: Address) -> Self {
        Self {
            registry: Registry::new(registry, client.clone()),
            client,
            token,
            entity_manager: None,
        }
    }

    /// Uses the default registry and token of `network`.
    pub fn for_network(client: Arc<M>, network: Network) -> Result<Self> {
        Ok(Self::new(client, network.default_registry()?, network.default_token()?))
    }

    /// The EntityManager is deployed outside the Registry, so its address is supplied directly.
    pub fn with_entity_manager(mut self, address: Address) -> Self {
        self.entity_manager = Some(address);
        self
    }

    pub fn client(&self) -> Arc<M> {
        self.client.clone()
    }

    pub fn registry(&self) -> &Registry<M> {
        &self.registry
    }

    /// Drops every cached registry lookup, e.g. after a governance upgrade.
    pub async fn refresh(&self) {
        self.registry.clear_cache().await;
    }

    pub fn token(&self) -> AudiusToken<M> {
        AudiusToken::new(self.token, self.client())
    }

    pub fn entity_manager(&self) -> Result<EntityManager<M>> {
        let address = self
            .entity_manager
            .ok_or_else(|| AudiusError::ContractNotRegistered("EntityManager".into()))?;
        Ok(EntityManager::new(address, self.client()))
    }

    pub async fn service_provider_factory(&self) -> Result<ServiceProviderFactory<M>> {
        let address = self.registry.address_of(ContractKey::ServiceProviderFactory).await?;
        Ok(ServiceProviderFactory::new(address, self.client()))
    }

    pub async fn delegate_manager(&self) -> Result<DelegateManager<M>> {
        let address = self.registry.address_of(ContractKey::DelegateManager).await?;
        Ok(DelegateManager::new(address, self.client()))
    }

    pub async fn staking(&self) -> Result<Staking<M>> {
        let address = self.registry.address_of(ContractKey::StakingProxy).await?;
        Ok(Staking::new(address, self.client()))
    }

    pub async fn service_type_manager(&self) -> Result<ServiceTypeManager<M>> {
        let address = self.registry.address_of(ContractKey::ServiceTypeManagerProxy).await?;
        Ok(ServiceTypeManager::new(address, self.client()))
    }

    pub async fn governance(&self) -> Result<Governance<M>> {
        let address = self.registry.address_of(ContractKey::Governance).await?;
        Ok(Governance::new(address, self.client()))
    }

    pub async fn claims_manager(&self) -> Result<ClaimsManager<M>> {
        let address = self.registry.address_of(ContractKey::ClaimsManagerProxy).await?;
        Ok(ClaimsManager::new(address, self.client()))
    }

    pub async fn rewards_manager(&self) -> Result<EthRewardsManager<M>> {
        let address = self.registry.address_of(ContractKey::EthRewardsManagerProxy).await?;
        Ok(EthRewardsManager::new(address, self.client()))
    }

    /// Resolves every [`ContractKey`] concurrently. Keys missing from the registry are listed in
    /// `unregistered` rather than failing the snapshot.
    pub async fn resolve_all(&self) -> Result<ContractAddresses> {
        let resolved: Vec<(ContractKey, Option<Address>)> = stream::iter(ContractKey::all())
            .map(|key| async move {
                match self.registry.address_of(key).await {
                    Ok(address) => Ok((key, Some(address))),
                    Err(AudiusError::ContractNotRegistered(_)) => Ok((key, None)),
                    Err(e) => Err(e),
                }
            })
            .buffer_unordered(8)
            .try_collect()
            .await?;

        let mut contracts = BTreeMap::new();
        let mut unregistered = Vec::new();
        for (key, address) in resolved {
            match address {
                Some(address) => {
                    contracts.insert(key, address);
                }
                None => unregistered.push(key),
            }
        }
        unregistered.sort();
        info!("Resolved {} contracts, {} unregistered", contracts.len(), unregistered.len());

        Ok(ContractAddresses {
            registry: self.registry.address(),
            token: self.token,
            entity_manager: self.entity_manager,
            contracts,
            unregistered,
        })
    }

    pub async fn address_for(&self, source: EventSource) -> Result<Address> {
        match (source, source.contract_key()) {
            (_, Some(key)) => self.registry.address_of(key).await,
            (EventSource::Registry, None) => Ok(self.registry.address()),
            (EventSource::Token, None) => Ok(self.token),
            (EventSource::EntityManager, None) => Ok(self.entity_manager()?.address()),
            (other, None) => Err(AudiusError::NoKnownAddress(other.to_string())),
        }
    }

    /// Watch targets for `sources`. An empty slice selects every contract with a known address.
    pub async fn watch_targets(&self, sources: &[EventSource]) -> Result<Vec<WatchTarget>> {
        if !sources.is_empty() {
            let mut targets = Vec::with_capacity(sources.len());
            for source in sources {
                targets.push(WatchTarget::new(*source, self.address_for(*source).await?));
            }
            return Ok(targets);
        }

        let mut targets = Vec::new();
        for source in EventSource::iter() {
            match self.address_for(source).await {
                Ok(address) => targets.push(WatchTarget::new(source, address)),
                Err(AudiusError::ContractNotRegistered(name)) => {
                    debug!("Skipping {source}: {name} is not registered")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(targets)
    }

    /// Approves Staking to pull `amount` from the sender unless the current allowance covers it.
    /// Returns the approval receipt when one was needed.
    pub async fn approve_staking(&self, amount: U256) -> Result<Option<TransactionReceipt>> {
        let staking = self.registry.address_of(ContractKey::StakingProxy).await?;
        let token = self.token();
        if let Some(sender) = self.client.default_sender() {
            let allowance = token.allowance(sender, staking).await?;
            if allowance >= amount {
                debug!("Allowance {allowance} already covers {amount}");
                return Ok(None);
            }
        }
        Ok(Some(token.approve_and_wait(staking, amount).await?))
    }

    /// Approves the stake and registers a new endpoint. The endpoint is checked before anything
    /// is sent.
    pub async fn register_with_stake(
        &self,
        service_type: &ServiceType,
        endpoint: &str,
        stake_amount: U256,
        delegate_owner_wallet: Address,
    ) -> Result<(TransactionReceipt, ServiceProviderRegistration)> {
        let endpoint = validate_endpoint(endpoint)?;
        self.approve_staking(stake_amount).await?;
        self.service_provider_factory()
            .await?
            .register(service_type, endpoint, stake_amount, delegate_owner_wallet)
            .await
    }

    pub async fn increase_stake_with_approval(&self, amount: U256) -> Result<TransactionReceipt> {
        self.approve_staking(amount).await?;
        self.service_provider_factory().await?.increase_stake(amount).await
    }

    pub async fn delegate_with_approval(
        &self,
        sp: Address,
        amount: U256,
    ) -> Result<TransactionReceipt> {
        self.approve_staking(amount).await?;
        self.delegate_manager().await?.delegate_stake(sp, amount).await
    }
}
