use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    providers::Middleware,
    types::{Address, TransactionReceipt, H256, U256},
};
use serde::{Deserialize, Serialize};

use crate::{bindings::EthRewardsManagerAbi, tx::send_and_confirm};

/// Configuration of the rewards bridge. `recipient` is the Solana account, kept as the raw 32
/// bytes the contract stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsManagerInfo {
    pub address: Address,
    pub token: Address,
    pub governance: Address,
    pub recipient: H256,
    pub anti_abuse_oracles: Vec<Address>,
}

/// EthRewardsManager wrapper. The contract holds minted rewards on Ethereum until anyone calls
/// `transferToSolana`, which sends the balance through the Wormhole bridge.
#[derive(Clone, Debug)]
pub struct EthRewardsManager<M: Middleware> {
    inner: EthRewardsManagerAbi<M>,
}

impl<M: Middleware> Deref for EthRewardsManager<M> {
    type Target = EthRewardsManagerAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> EthRewardsManager<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: EthRewardsManagerAbi::new(address, client) }
    }

    pub async fn recipient(&self) -> Result<[u8; 32]> {
        Ok(self.get_recipient_address().call().await?)
    }

    pub async fn anti_abuse_oracles(&self) -> Result<Vec<Address>> {
        Ok(self.get_anti_abuse_oracle_addresses().call().await?)
    }

    pub async fn token(&self) -> Result<Address> {
        Ok(self.inner.token().call().await?)
    }

    pub async fn governance(&self) -> Result<Address> {
        Ok(self.get_governance_address().call().await?)
    }

    pub async fn info(&self) -> Result<RewardsManagerInfo> {
        let (token, governance, recipient, anti_abuse_oracles) = futures::try_join!(
            self.token(),
            self.governance(),
            self.recipient(),
            self.anti_abuse_oracles(),
        )?;
        Ok(RewardsManagerInfo {
            address: self.address(),
            token,
            governance,
            recipient: H256(recipient),
            anti_abuse_oracles,
        })
    }

    /// Bridges the contract's whole token balance to the Solana recipient. `arbiter_fee` goes to
    /// whoever relays the transfer on the Solana side.
    pub async fn transfer_to_solana(
        &self,
        arbiter_fee: U256,
        nonce: u32,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.inner.transfer_to_solana(arbiter_fee, nonce), "transfer to solana")
            .await
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

    fn manager() -> (EthRewardsManager<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (EthRewardsManager::new(Address::repeat_byte(0x5e), Arc::new(provider)), mock)
    }

    #[tokio::test]
    async fn test_recipient_is_raw_bytes32() {
        let (manager, mock) = manager();
        let recipient = [0x9f; 32];
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::FixedBytes(recipient.to_vec())]).into())
            .unwrap();

        assert_eq!(manager.recipient().await.unwrap(), recipient);
    }

    #[tokio::test]
    async fn test_anti_abuse_oracles() {
        let (manager, mock) = manager();
        let oracles = vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)];
        let encoded = abi::encode(&[Token::Array(
            oracles.iter().copied().map(Token::Address).collect(),
        )]);
        mock.push::<Bytes, Bytes>(encoded.into()).unwrap();

        assert_eq!(manager.anti_abuse_oracles().await.unwrap(), oracles);
    }

    #[tokio::test]
    async fn test_token_address() {
        let (manager, mock) = manager();
        let token = Address::repeat_byte(0x18);
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Address(token)]).into()).unwrap();

        assert_eq!(manager.token().await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_info() {
        let (manager, mock) = manager();
        let oracles = vec![Address::repeat_byte(0x01)];
        // Joined calls are issued in argument order and responses pop last-in first-out.
        let encoded = abi::encode(&[Token::Array(vec![Token::Address(oracles[0])])]);
        mock.push::<Bytes, Bytes>(encoded.into()).unwrap();
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::FixedBytes(vec![0x9f; 32])]).into()).unwrap();
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Address(Address::repeat_byte(0x4a))]).into())
            .unwrap();
        mock.push::<Bytes, Bytes>(abi::encode(&[Token::Address(Address::repeat_byte(0x18))]).into())
            .unwrap();

        let info = manager.info().await.unwrap();
        assert_eq!(info.address, Address::repeat_byte(0x5e));
        assert_eq!(info.token, Address::repeat_byte(0x18));
        assert_eq!(info.governance, Address::repeat_byte(0x4a));
        assert_eq!(info.recipient, H256::repeat_byte(0x9f));
        assert_eq!(info.anti_abuse_oracles, oracles);
    }
}
