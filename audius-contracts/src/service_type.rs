use std::{convert::Infallible, fmt, str::FromStr};

use audius_error::Result;
use serde::{Deserialize, Serialize};

use crate::key::{from_bytes32, to_bytes32};

/// Service types registered in the ServiceTypeManager. Unknown types registered later by
/// governance are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ServiceType {
    DiscoveryNode,
    ContentNode,
    Validator,
    Other(String),
}

impl ServiceType {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceType::DiscoveryNode => "discovery-node",
            ServiceType::ContentNode => "content-node",
            ServiceType::Validator => "validator",
            ServiceType::Other(name) => name,
        }
    }

    pub fn to_bytes32(&self) -> Result<[u8; 32]> {
        to_bytes32(self.as_str())
    }

    pub fn from_bytes32(raw: [u8; 32]) -> Result<Self> {
        Ok(from_bytes32(raw)?.into())
    }
}

impl FromStr for ServiceType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "discovery-node" | "discovery-provider" => ServiceType::DiscoveryNode,
            "content-node" | "creator-node" => ServiceType::ContentNode,
            "validator" => ServiceType::Validator,
            other => ServiceType::Other(other.to_owned()),
        })
    }
}

impl From<String> for ServiceType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(service_type) => service_type,
            Err(never) => match never {},
        }
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_names() {
        assert_eq!("discovery-provider".parse::<ServiceType>().unwrap(), ServiceType::DiscoveryNode);
        assert_eq!("creator-node".parse::<ServiceType>().unwrap(), ServiceType::ContentNode);
        assert_eq!("content-node".parse::<ServiceType>().unwrap(), ServiceType::ContentNode);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let parsed: ServiceType = "storage-node".parse().unwrap();
        assert_eq!(parsed, ServiceType::Other("storage-node".into()));
        assert_eq!(parsed.to_string(), "storage-node");
    }

    #[test]
    fn test_bytes32_uses_canonical_name() {
        let raw = ServiceType::ContentNode.to_bytes32().unwrap();
        assert_eq!(&raw[..12], b"content-node");
        assert_eq!(ServiceType::from_bytes32(raw).unwrap(), ServiceType::ContentNode);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&ServiceType::DiscoveryNode).unwrap();
        assert_eq!(json, "\"discovery-node\"");
        let back: ServiceType = serde_json::from_str("\"validator\"").unwrap();
        assert_eq!(back, ServiceType::Validator);
    }
}
