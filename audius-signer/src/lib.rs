use std::{
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
};

use async_trait::async_trait;
use audius_io::{read_json, write_json, IoError};
use ethers::{
    core::{rand::thread_rng, types::Signature, utils::hex::ToHex},
    signers::{LocalWallet, Signer, WalletError},
    types::{
        transaction::{eip2718::TypedTransaction, eip712::Eip712},
        Address,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod keyfile;

pub use keyfile::{EcdsaKeyfile, KeyfileError};

/// Key that signs service provider, delegator and EntityManager transactions. Derefs to the
/// inner `LocalWallet`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudiusWallet(LocalWallet);

#[derive(thiserror::Error, Debug)]
pub enum AudiusWalletError {
    #[error(transparent)]
    WalletError(#[from] WalletError),
    #[error(transparent)]
    IoError(#[from] IoError),
}

impl AudiusWallet {
    pub fn new() -> Self {
        Self(LocalWallet::new(&mut thread_rng()))
    }

    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key: &str) -> Result<Self, AudiusWalletError> {
        Ok(Self(LocalWallet::from_str(private_key.trim_start_matches("0x"))?))
    }

    pub fn from_keystore(path: &Path, password: &str) -> Result<Self, AudiusWalletError> {
        Ok(Self(LocalWallet::decrypt_keystore(path, password)?))
    }

    /// Address recorded in a keystore written by [`AudiusWallet::encrypt_and_store`]. Keystores
    /// from other tools may not carry one.
    pub fn keystore_address(path: &Path) -> Result<Option<Address>, AudiusWalletError> {
        let keystore: Keystore = read_json(path)?;
        Ok(keystore.address)
    }

    /// Writes an encrypted keystore to `dir/name` and records the address next to the ciphertext.
    pub fn encrypt_and_store(
        &self,
        dir: &Path,
        name: &str,
        password: &str,
    ) -> Result<PathBuf, AudiusWalletError> {
        let key = self.0.signer().to_bytes();
        LocalWallet::encrypt_keystore(dir, &mut thread_rng(), key, password, Some(name))?;

        let path = dir.join(name);
        let mut keystore: Keystore = read_json(&path)?;
        keystore.address = Some(self.0.address());
        write_json(&path, &keystore)?;
        Ok(path)
    }

    pub fn to_private_key(&self) -> String {
        self.0.signer().to_bytes().encode_hex::<String>()
    }

    pub fn address(&self) -> Address {
        self.0.address()
    }
}

impl Default for AudiusWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for AudiusWallet {
    type Target = LocalWallet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl Signer for AudiusWallet {
    type Error = WalletError;

    async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<Signature, Self::Error> {
        self.0.sign_message(message).await
    }

    async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Signature, Self::Error> {
        self.0.sign_transaction(tx).await
    }

    async fn sign_typed_data<T: Eip712 + Send + Sync>(
        &self,
        payload: &T,
    ) -> Result<Signature, Self::Error> {
        self.0.sign_typed_data(payload).await
    }

    fn address(&self) -> Address {
        self.0.address()
    }

    fn chain_id(&self) -> u64 {
        self.0.chain_id()
    }

    fn with_chain_id<T: Into<u64>>(self, chain_id: T) -> Self {
        Self(self.0.with_chain_id(chain_id))
    }
}

/// Web3 secret storage file. `address` is optional in the format and left out by ethers.
#[derive(Debug, Serialize, Deserialize)]
struct Keystore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<Address>,
    crypto: Value,
    id: String,
    version: u32,
}
