use std::{ops::Deref, sync::Arc};

use audius_error::{AudiusError, Result};
use ethers::{
    providers::Middleware,
    types::{Address, U256},
};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::{
    bindings::ServiceTypeManagerAbi,
    key::{from_bytes32, to_bytes32},
    service_type::ServiceType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTypeInfo {
    pub is_valid: bool,
    pub min_stake: U256,
    pub max_stake: U256,
}

impl From<(bool, U256, U256)> for ServiceTypeInfo {
    fn from((is_valid, min_stake, max_stake): (bool, U256, U256)) -> Self {
        Self { is_valid, min_stake, max_stake }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceTypeManager<M: Middleware> {
    inner: ServiceTypeManagerAbi<M>,
}

impl<M: Middleware> Deref for ServiceTypeManager<M> {
    type Target = ServiceTypeManagerAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> ServiceTypeManager<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: ServiceTypeManagerAbi::new(address, client) }
    }

    pub async fn valid_service_types(&self) -> Result<Vec<ServiceType>> {
        self.get_valid_service_types()
            .call()
            .await?
            .into_iter()
            .map(ServiceType::from_bytes32)
            .collect()
    }

    pub async fn service_type_info(&self, service_type: &ServiceType) -> Result<ServiceTypeInfo> {
        Ok(self.get_service_type_info(service_type.to_bytes32()?).call().await?.into())
    }

    pub async fn current_version(&self, service_type: &ServiceType) -> Result<String> {
        from_bytes32(self.get_current_version(service_type.to_bytes32()?).call().await?)
    }

    /// Every version ever set for `service_type`, oldest first.
    pub async fn versions(&self, service_type: &ServiceType) -> Result<Vec<String>> {
        let raw_type = service_type.to_bytes32()?;
        let count = self.get_number_of_versions(raw_type).call().await?;
        let count = u64::try_from(count).map_err(|_| AudiusError::CountOverflow {
            what: "version",
            value: count.to_string(),
        })?;
        stream::iter(0..count)
            .map(|index| async move {
                from_bytes32(self.get_version(raw_type, U256::from(index)).call().await?)
            })
            .buffered(8)
            .try_collect()
            .await
    }

    pub async fn is_valid_version(&self, service_type: &ServiceType, version: &str) -> Result<bool> {
        Ok(self
            .service_version_is_valid(service_type.to_bytes32()?, to_bytes32(version)?)
            .call()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        abi::{self, Token},
        providers::{MockProvider, Provider},
        types::Bytes,
    };

    fn manager() -> (ServiceTypeManager<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (ServiceTypeManager::new(Address::repeat_byte(0x05), Arc::new(provider)), mock)
    }

    fn word(value: &str) -> Token {
        Token::FixedBytes(to_bytes32(value).unwrap().to_vec())
    }

    #[tokio::test]
    async fn test_valid_service_types() {
        let (manager, mock) = manager();
        let encoded: Bytes =
            abi::encode(&[Token::Array(vec![word("discovery-node"), word("content-node")])]).into();
        mock.push::<Bytes, _>(encoded).unwrap();

        assert_eq!(
            manager.valid_service_types().await.unwrap(),
            vec![ServiceType::DiscoveryNode, ServiceType::ContentNode]
        );
    }

    #[tokio::test]
    async fn test_current_version() {
        let (manager, mock) = manager();
        mock.push::<Bytes, Bytes>(abi::encode(&[word("0.3.58")]).into()).unwrap();

        assert_eq!(manager.current_version(&ServiceType::ContentNode).await.unwrap(), "0.3.58");
    }

    #[tokio::test]
    async fn test_service_type_info() {
        let (manager, mock) = manager();
        let wei = U256::exp10(18);
        mock.push::<Bytes, Bytes>(
            abi::encode(&[
                Token::Bool(true),
                Token::Uint(wei * 200_000),
                Token::Uint(wei * 15_000_000),
            ])
            .into(),
        )
        .unwrap();

        let info = manager.service_type_info(&ServiceType::DiscoveryNode).await.unwrap();
        assert!(info.is_valid);
        assert_eq!(info.min_stake, wei * 200_000);
    }

    #[tokio::test]
    async fn test_versions_oldest_first() {
        let (manager, mock) = manager();
        // Responses pop last-in first-out: the count is read before any version.
        for version in ["0.3.58", "0.3.57", "0.3.56"] {
            mock.push::<Bytes, Bytes>(abi::encode(&[word(version)]).into()).unwrap();
        }
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Uint(U256::from(3))]).into()).unwrap();

        assert_eq!(
            manager.versions(&ServiceType::DiscoveryNode).await.unwrap(),
            vec!["0.3.56", "0.3.57", "0.3.58"]
        );
    }

    #[tokio::test]
    async fn test_versions_count_overflow() {
        let (manager, mock) = manager();
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Uint(U256::MAX)]).into()).unwrap();

        assert!(matches!(
            manager.versions(&ServiceType::ContentNode).await,
            Err(AudiusError::CountOverflow { what: "version", .. })
        ));
    }
}
