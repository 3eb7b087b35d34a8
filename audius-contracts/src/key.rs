use audius_error::{AudiusError, Result};
use audius_macros::bytes32;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

/// Names under which the Registry contract stores the protocol's contract addresses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum ContractKey {
    ServiceTypeManagerProxy,
    ServiceProviderFactory,
    StakingProxy,
    DelegateManager,
    Governance,
    ClaimsManagerProxy,
    EthRewardsManagerProxy,
}

impl ContractKey {
    /// Registry name, identical to the variant name.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn bytes32(&self) -> [u8; 32] {
        match self {
            ContractKey::ServiceTypeManagerProxy => bytes32!("ServiceTypeManagerProxy"),
            ContractKey::ServiceProviderFactory => bytes32!("ServiceProviderFactory"),
            ContractKey::StakingProxy => bytes32!("StakingProxy"),
            ContractKey::DelegateManager => bytes32!("DelegateManager"),
            ContractKey::Governance => bytes32!("Governance"),
            ContractKey::ClaimsManagerProxy => bytes32!("ClaimsManagerProxy"),
            ContractKey::EthRewardsManagerProxy => bytes32!("EthRewardsManagerProxy"),
        }
    }

    pub fn from_bytes32(raw: [u8; 32]) -> Option<Self> {
        ContractKey::iter().find(|key| key.bytes32() == raw)
    }

    pub fn all() -> impl Iterator<Item = ContractKey> {
        ContractKey::iter()
    }
}

/// Left-aligns the utf-8 bytes of `value` in a zero-padded `bytes32`.
pub fn to_bytes32(value: &str) -> Result<[u8; 32]> {
    if value.len() > 32 {
        return Err(AudiusError::Bytes32TooLong(value.to_owned()));
    }
    let mut raw = [0u8; 32];
    raw[..value.len()].copy_from_slice(value.as_bytes());
    Ok(raw)
}

/// Inverse of [`to_bytes32`]: trailing zero padding is dropped.
pub fn from_bytes32(raw: [u8; 32]) -> Result<String> {
    let len = raw.iter().rposition(|b| *b != 0).map_or(0, |last| last + 1);
    Ok(String::from_utf8(raw[..len].to_vec())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_matches_runtime_encoding() {
        for key in ContractKey::all() {
            assert_eq!(key.bytes32(), to_bytes32(key.name()).unwrap(), "{key}");
            assert_eq!(from_bytes32(key.bytes32()).unwrap(), key.name());
            assert_eq!(ContractKey::from_bytes32(key.bytes32()), Some(key));
        }
    }

    #[test]
    fn test_bytes32_layout() {
        let raw = to_bytes32("StakingProxy").unwrap();
        assert_eq!(&raw[..12], b"StakingProxy");
        assert!(raw[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_bytes32_limits() {
        let exact = "a".repeat(32);
        assert_eq!(from_bytes32(to_bytes32(&exact).unwrap()).unwrap(), exact);
        assert!(matches!(to_bytes32(&"a".repeat(33)), Err(AudiusError::Bytes32TooLong(_))));
        assert_eq!(from_bytes32([0u8; 32]).unwrap(), "");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut raw = [0u8; 32];
        raw[0] = 0xff;
        assert!(matches!(from_bytes32(raw), Err(AudiusError::InvalidUtf8Bytes32(_))));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(ContractKey::from_bytes32(to_bytes32("TrustedNotifierManager").unwrap()), None);
    }
}
