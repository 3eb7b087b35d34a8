use audius_error::{AudiusError, Result};
use audius_macros::h160;
use ethers::types::{Address, Chain};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Networks the client knows how to reach. Only mainnet ships with default contract addresses;
/// the others must be configured explicitly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Network {
    #[default]
    #[strum(to_string = "mainnet", serialize = "main")]
    Mainnet,
    #[strum(to_string = "sepolia", serialize = "testnet")]
    Sepolia,
    #[strum(to_string = "local", serialize = "localhost", serialize = "anvil")]
    Local,
}

impl Network {
    pub fn chain(&self) -> Chain {
        match self {
            Network::Mainnet => Chain::Mainnet,
            Network::Sepolia => Chain::Sepolia,
            Network::Local => Chain::AnvilHardhat,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain().into()
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match Chain::try_from(chain_id).ok()? {
            Chain::Mainnet => Some(Network::Mainnet),
            Chain::Sepolia => Some(Network::Sepolia),
            Chain::AnvilHardhat => Some(Network::Local),
            _ => None,
        }
    }

    /// Address of the Registry contract, the entry point for resolving every other contract.
    pub fn default_registry(&self) -> Result<Address> {
        match self {
            Network::Mainnet => Ok(h160!(0xd976d3b4f4e22a238c1A736b6612D22f17b6f64C)),
            _ => Err(self.not_configured("registry address")),
        }
    }

    /// AUDIO token. The token is not registered in the Registry so it needs its own default.
    pub fn default_token(&self) -> Result<Address> {
        match self {
            Network::Mainnet => Ok(h160!(0x18aAA7115705e8be94bfFEBDE57Af9BFc265B998)),
            _ => Err(self.not_configured("token address")),
        }
    }

    pub fn not_configured(&self, what: &'static str) -> AudiusError {
        AudiusError::NetworkNotConfigured { what, network: self.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ids() {
        assert_eq!(Network::Mainnet.chain_id(), 1);
        assert_eq!(Network::Sepolia.chain_id(), 11155111);
        assert_eq!(Network::Local.chain_id(), 31337);
        assert_eq!(Network::from_chain_id(11155111), Some(Network::Sepolia));
        assert_eq!(Network::from_chain_id(17000), None);
    }

    #[test]
    fn test_defaults_only_on_mainnet() {
        assert_eq!(
            Network::Mainnet.default_registry().unwrap(),
            "0xd976d3b4f4e22a238c1A736b6612D22f17b6f64C".parse::<Address>().unwrap()
        );
        assert!(matches!(
            Network::Sepolia.default_token(),
            Err(AudiusError::NetworkNotConfigured { what: "token address", .. })
        ));
    }

    #[test]
    fn test_parse_and_display() {
        for network in [Network::Mainnet, Network::Sepolia, Network::Local] {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
        assert_eq!("Anvil".parse::<Network>().unwrap(), Network::Local);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Sepolia);
        assert!("holesky".parse::<Network>().is_err());
    }
}
