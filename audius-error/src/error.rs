use audius_io::IoError;
use audius_signer::{AudiusWalletError, KeyfileError};
use ethers::{
    abi::{self, ParamType, Token},
    contract::ContractError,
    providers::{JsonRpcError, Middleware, MiddlewareError as _, ProviderError},
    signers::WalletError,
    types::{Bytes, SignatureError, H256},
    utils::{hex::FromHexError, ConversionError},
};
use thiserror::Error;

use crate::AudiusSignerProviderError;

/// Selector of Solidity's `Error(string)`.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub type Result<T> = std::result::Result<T, AudiusError>;

#[derive(Debug, Error)]
pub enum AudiusError {
    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error(transparent)]
    WalletError(#[from] WalletError),

    #[error(transparent)]
    AudiusWalletError(#[from] AudiusWalletError),

    #[error(transparent)]
    KeyfileError(#[from] KeyfileError),

    #[error(transparent)]
    IoError(#[from] IoError),

    #[error(transparent)]
    HexError(#[from] FromHexError),

    #[error(transparent)]
    AbiError(#[from] abi::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    SignatureError(#[from] SignatureError),

    #[error(transparent)]
    ConversionError(#[from] ConversionError),

    #[error(transparent)]
    SignerMiddlewareError(#[from] AudiusSignerProviderError),

    #[error("Contract reverted: {}", describe_revert(.0))]
    ContractRevert(Bytes),

    #[error("JSON RPC Error {0}")]
    JsonRpcError(JsonRpcError),

    #[error("Unknown contract error: {0}")]
    UnknownContractError(String),

    #[error("No contract registered under key {0}")]
    ContractNotRegistered(String),

    #[error("\"{0}\" does not fit in bytes32")]
    Bytes32TooLong(String),

    #[error("bytes32 value is not valid utf-8: {0}")]
    InvalidUtf8Bytes32(#[from] std::string::FromUtf8Error),

    #[error("Unknown {kind} value {value}")]
    UnknownEnumValue { kind: &'static str, value: u8 },

    #[error("Expected event {0} in transaction receipt")]
    MissingEvent(String),

    #[error("Transaction {0:?} was dropped before it was mined")]
    NoReceipt(H256),

    #[error("Transaction {0:?} reverted on chain")]
    TransactionFailed(H256),

    #[error("No {what} configured for network {network}")]
    NetworkNotConfigured { what: &'static str, network: String },

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: &'static str },

    #[error("No contracts to watch")]
    NothingToWatch,

    #[error("{0} has neither a registry entry nor a configured address")]
    NoKnownAddress(String),

    #[error("{what} count {value} does not fit in u64")]
    CountOverflow { what: &'static str, value: String },
}

impl<M: Middleware> From<ContractError<M>> for AudiusError {
    fn from(value: ContractError<M>) -> Self {
        match value {
            ContractError::Revert(bytes) => AudiusError::ContractRevert(bytes),
            ContractError::MiddlewareError { e } => match e.as_error_response() {
                Some(err) => AudiusError::JsonRpcError(err.clone()),
                None => AudiusError::UnknownContractError(e.to_string()),
            },
            ContractError::ProviderError { e } => match e.as_error_response() {
                Some(err) => AudiusError::JsonRpcError(err.clone()),
                None => AudiusError::ProviderError(e),
            },
            ContractError::DecodingError(e) => AudiusError::AbiError(e),
            other => AudiusError::UnknownContractError(other.to_string()),
        }
    }
}

fn describe_revert(data: &Bytes) -> String {
    revert_reason(data).unwrap_or_else(|| data.to_string())
}

/// Decodes the message of a `require(cond, "message")` style revert. Custom errors and bare
/// reverts return `None`.
pub fn revert_reason(data: &Bytes) -> Option<String> {
    let payload = data.as_ref().strip_prefix(&ERROR_STRING_SELECTOR)?;
    match abi::decode(&[ParamType::String], payload).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{Http, Provider};

    fn encoded_revert(reason: &str) -> Bytes {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(abi::encode(&[Token::String(reason.to_owned())]));
        data.into()
    }

    #[test]
    fn test_revert_reason_decodes_error_string() {
        let data = encoded_revert("ServiceProviderFactory: Endpoint already registered");
        assert_eq!(
            revert_reason(&data).as_deref(),
            Some("ServiceProviderFactory: Endpoint already registered")
        );
    }

    #[test]
    fn test_revert_reason_ignores_custom_errors() {
        let data = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, 0x00]);
        assert_eq!(revert_reason(&data), None);
        assert_eq!(revert_reason(&Bytes::new()), None);
    }

    #[test]
    fn test_contract_revert_conversion() {
        let err: ContractError<Provider<Http>> =
            ContractError::Revert(encoded_revert("Staking: Minimum stake"));
        let err = AudiusError::from(err);
        assert!(matches!(err, AudiusError::ContractRevert(_)));
        assert_eq!(err.to_string(), "Contract reverted: Staking: Minimum stake");
    }

    #[test]
    fn test_json_rpc_error_conversion() {
        let rpc = JsonRpcError { code: -32000, message: "execution reverted".into(), data: None };
        let err: ContractError<Provider<Http>> =
            ContractError::ProviderError { e: ProviderError::JsonRpcClientError(Box::new(
                ethers::providers::HttpClientError::JsonRpcError(rpc),
            )) };
        match AudiusError::from(err) {
            AudiusError::JsonRpcError(e) => assert_eq!(e.code, -32000),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_watch_and_endpoint_messages() {
        assert_eq!(AudiusError::NothingToWatch.to_string(), "No contracts to watch");
        assert_eq!(
            AudiusError::NoKnownAddress("entity-manager".into()).to_string(),
            "entity-manager has neither a registry entry nor a configured address"
        );
        let err = AudiusError::InvalidEndpoint {
            endpoint: "http://dn1.audius.co".into(),
            reason: "scheme must be https",
        };
        assert_eq!(err.to_string(), "Invalid endpoint http://dn1.audius.co: scheme must be https");
    }
}
