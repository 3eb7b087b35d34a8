use std::{
    collections::{BTreeMap, HashMap},
    ops::Deref,
    sync::Arc,
};

use audius_error::{AudiusError, Result};
use ethers::{
    providers::Middleware,
    types::{Address, Filter, U256},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    bindings::{RegistryAbi, RegistryAbiEvents},
    events::{fetch_events_between, head_block},
    key::{from_bytes32, to_bytes32, ContractKey},
};

/// The Registry is the single on-chain source of contract addresses. Lookups by key are cached
/// for the lifetime of the wrapper since addresses only change through governance upgrades.
#[derive(Debug)]
pub struct Registry<M: Middleware> {
    inner: RegistryAbi<M>,
    cache: Mutex<HashMap<ContractKey, Address>>,
}

impl<M: Middleware> Deref for Registry<M> {
    type Target = RegistryAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware> Registry<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: RegistryAbi::new(address, client), cache: Mutex::new(HashMap::new()) }
    }

    pub async fn address_of(&self, key: ContractKey) -> Result<Address> {
        if let Some(address) = self.cache.lock().await.get(&key) {
            return Ok(*address);
        }
        let address = self.address_of_name(key.name()).await?;
        debug!("Resolved {key} to {address:?}");
        self.cache.lock().await.insert(key, address);
        Ok(address)
    }

    /// Uncached lookup for names outside [`ContractKey`].
    pub async fn address_of_name(&self, name: &str) -> Result<Address> {
        let address = self.get_contract(to_bytes32(name)?).call().await?;
        if address.is_zero() {
            return Err(AudiusError::ContractNotRegistered(name.to_owned()));
        }
        Ok(address)
    }

    /// Address of `key` at registry version `version`, counting from 1.
    pub async fn address_at_version(&self, key: ContractKey, version: u64) -> Result<Address> {
        Ok(self.get_contract_version(key.bytes32(), U256::from(version)).call().await?)
    }

    pub async fn version_count(&self, key: ContractKey) -> Result<U256> {
        Ok(self.get_contract_version_count(key.bytes32()).call().await?)
    }

    /// Replays the registry's add, remove and upgrade events from `from_block` to the head and
    /// returns the resulting name to address map. Names that are not valid utf-8 are keyed by
    /// their hex encoding.
    pub async fn registered_contracts(&self, from_block: u64) -> Result<BTreeMap<String, Address>> {
        let client = self.client();
        let head = head_block(client.as_ref()).await?;
        let filter = Filter::new().address(self.address());
        let events =
            fetch_events_between::<M, RegistryAbiEvents>(client.as_ref(), &filter, from_block, head)
                .await?;

        let contracts = replay(events.into_iter().map(|(event, _)| event));
        info!("Registry lists {} contracts as of block {head}", contracts.len());
        Ok(contracts)
    }

    pub(crate) async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

fn registry_name(raw: [u8; 32]) -> String {
    from_bytes32(raw).unwrap_or_else(|_| format!("0x{}", ethers::utils::hex::encode(raw)))
}

fn replay(events: impl Iterator<Item = RegistryAbiEvents>) -> BTreeMap<String, Address> {
    let mut contracts = BTreeMap::new();
    for event in events {
        match event {
            RegistryAbiEvents::ContractAddedFilter(added) => {
                contracts.insert(registry_name(added.name), added.address);
            }
            RegistryAbiEvents::ContractUpgradedFilter(upgraded) => {
                contracts.insert(registry_name(upgraded.name), upgraded.new_address);
            }
            RegistryAbiEvents::ContractRemovedFilter(removed) => {
                contracts.remove(&registry_name(removed.name));
            }
            RegistryAbiEvents::OwnershipTransferredFilter(_) => {}
        }
    }
    contracts
}
