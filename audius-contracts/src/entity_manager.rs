use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    abi::{self, Token},
    contract::LogMeta,
    core::rand::{thread_rng, Rng},
    providers::Middleware,
    signers::{Signer, WalletError},
    types::{
        transaction::eip712::{EIP712Domain, Eip712, Eip712Error},
        Address, Bytes, Filter, TransactionReceipt, U256,
    },
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bindings::{EntityManagerAbi, EntityManagerAbiEvents},
    events::{fetch_events_between, middleware_error},
    tx::send_and_confirm,
};

pub const DOMAIN_NAME: &str = "Entity Manager";
pub const DOMAIN_VERSION: &str = "1";

const MANAGE_ENTITY_TYPE: &str =
    "ManageEntity(uint userId,string entityType,uint entityId,string action,string metadata,bytes32 nonce)";

/// One entity action (create a track, follow a user, ...) as signed by the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageEntityRequest {
    pub user_id: U256,
    pub entity_type: String,
    pub entity_id: U256,
    pub action: String,
    pub metadata: String,
    pub nonce: [u8; 32],
}

impl ManageEntityRequest {
    /// Builds a request with a fresh random nonce.
    pub fn new(
        user_id: U256,
        entity_type: impl Into<String>,
        entity_id: U256,
        action: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            metadata: metadata.into(),
            nonce: thread_rng().gen(),
        }
    }
}

/// `ManageEntityRequest` bound to a deployment, i.e. the full EIP-712 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManageEntityTypedData {
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub request: ManageEntityRequest,
}

impl Eip712 for ManageEntityTypedData {
    type Error = Eip712Error;

    fn domain(&self) -> std::result::Result<EIP712Domain, Self::Error> {
        Ok(EIP712Domain {
            name: Some(DOMAIN_NAME.to_owned()),
            version: Some(DOMAIN_VERSION.to_owned()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        })
    }

    fn type_hash() -> std::result::Result<[u8; 32], Self::Error> {
        Ok(keccak256(MANAGE_ENTITY_TYPE))
    }

    fn struct_hash(&self) -> std::result::Result<[u8; 32], Self::Error> {
        let request = &self.request;
        let encoded = abi::encode(&[
            Token::FixedBytes(Self::type_hash()?.to_vec()),
            Token::Uint(request.user_id),
            Token::FixedBytes(keccak256(&request.entity_type).to_vec()),
            Token::Uint(request.entity_id),
            Token::FixedBytes(keccak256(&request.action).to_vec()),
            Token::FixedBytes(keccak256(&request.metadata).to_vec()),
            Token::FixedBytes(request.nonce.to_vec()),
        ]);
        Ok(keccak256(encoded))
    }
}

#[derive(Clone, Debug)]
pub struct EntityManager<M: Middleware> {
    inner: EntityManagerAbi<M>,
}

impl<M: Middleware> Deref for EntityManager<M> {
    type Target = EntityManagerAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> EntityManager<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: EntityManagerAbi::new(address, client) }
    }

    pub async fn typed_data(&self, request: ManageEntityRequest) -> Result<ManageEntityTypedData> {
        let chain_id = self.client().get_chainid().await.map_err(middleware_error::<M>)?;
        Ok(ManageEntityTypedData {
            chain_id: chain_id.as_u64(),
            verifying_contract: self.address(),
            request,
        })
    }

    /// Signs `request` with `signer` and submits it through this contract's client, which may be
    /// a relayer rather than the signing user.
    pub async fn manage_entity_signed<S>(
        &self,
        signer: &S,
        request: ManageEntityRequest,
    ) -> Result<TransactionReceipt>
    where
        S: Signer<Error = WalletError>,
    {
        let typed = self.typed_data(request).await?;
        let signature = signer.sign_typed_data(&typed).await?;
        debug!(
            "{:?} signed {} {}",
            signer.address(),
            typed.request.action,
            typed.request.entity_type
        );

        let ManageEntityRequest { user_id, entity_type, entity_id, action, metadata, nonce } =
            typed.request;
        let call = self.manage_entity(
            user_id,
            entity_type,
            entity_id,
            action,
            metadata,
            nonce,
            Bytes::from(signature.to_vec()),
        );
        send_and_confirm(call, "manage entity").await
    }

    /// Whether the EIP-712 digest of a request was already consumed.
    pub async fn is_signature_used(&self, digest: [u8; 32]) -> Result<bool> {
        Ok(self.used_signatures(digest).call().await?)
    }

    /// `ManageEntity` and `ManageIsVerified` events. Neither event indexes the user, so the
    /// `user_id` filter runs on the decoded logs.
    pub async fn manage_entity_events(
        &self,
        user_id: Option<U256>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(EntityManagerAbiEvents, LogMeta)>> {
        let filter = Filter::new().address(self.address());
        let mut events: Vec<(EntityManagerAbiEvents, LogMeta)> =
            fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await?;
        if let Some(user_id) = user_id {
            events.retain(|(event, _)| event_user_id(event) == user_id);
        }
        Ok(events)
    }
}

fn event_user_id(event: &EntityManagerAbiEvents) -> U256 {
    match event {
        EntityManagerAbiEvents::ManageEntityFilter(e) => e.user_id,
        EntityManagerAbiEvents::ManageIsVerifiedFilter(e) => e.user_id,
    }
}
