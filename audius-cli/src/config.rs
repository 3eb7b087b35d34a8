use std::path::{Path, PathBuf};

use audius_contracts::Network;
use audius_error::AudiusError;
use audius_io::{read_toml, write_toml, IoError};
use audius_signer::{AudiusWalletError, EcdsaKeyfile, KeyfileError};
use clap::Parser;
use ethers::types::Address;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::error::Error;

pub const CONFIG_FILE: &str = "audius-config.toml";
pub const DEFAULT_PW_ENV_VAR: &str = "AUDIUS_KEYFILE_PASSWORD";

pub static DEFAULT_CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".audius")
});

#[derive(Parser, Debug, Clone)]
pub enum ConfigCommands {
    #[command(name = "set", about = "Set RPC urls, contract addresses or the signing keyfile")]
    Set {
        #[command(subcommand)]
        command: ConfigSetCommands,
    },
    #[command(name = "get", about = "Print the stored configuration")]
    Get,
}

#[derive(Parser, Debug, Clone)]
pub enum ConfigSetCommands {
    #[command(name = "rpc", about = "Set the JSON-RPC url of 'mainnet', 'sepolia' or 'local' <NETWORK> <URL>")]
    Rpc { network: Network, rpc_url: String },
    #[command(name = "ws", about = "Set the websocket url used by `watch` <NETWORK> <URL>")]
    Ws { network: Network, ws_url: String },
    #[command(name = "registry", about = "Override the Registry address of a network <NETWORK> <ADDRESS>")]
    Registry { network: Network, address: Address },
    #[command(name = "token", about = "Override the AUDIO token address of a network <NETWORK> <ADDRESS>")]
    Token { network: Network, address: Address },
    #[command(name = "entity-manager", about = "Set the EntityManager address of a network <NETWORK> <ADDRESS>")]
    EntityManager { network: Network, address: Address },
    #[command(name = "keyfile", about = "Import an encrypted keystore used to sign transactions <PATH>")]
    Keyfile {
        path: PathBuf,
        /// Environment variable holding the keystore password
        #[arg(long, default_value = DEFAULT_PW_ENV_VAR)]
        pw_env_var: String,
    },
}

pub fn parse_config_subcommands(
    subcmd: ConfigCommands,
    config: &mut AudiusConfig,
) -> Result<(), Error> {
    match subcmd {
        ConfigCommands::Set { command } => {
            parse_config_setter_commands(command, config)?;
            config.store()?;
        }
        ConfigCommands::Get => {
            println!("# {}", config.file().display());
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

fn parse_config_setter_commands(
    setter: ConfigSetCommands,
    config: &mut AudiusConfig,
) -> Result<(), Error> {
    match setter {
        ConfigSetCommands::Rpc { network, rpc_url } => {
            println!("Setting {network} rpc url to: {rpc_url}");
            config.set_rpc_url(network, &rpc_url);
        }
        ConfigSetCommands::Ws { network, ws_url } => {
            println!("Setting {network} websocket url to: {ws_url}");
            config.network_mut(network).ws_url = Some(ws_url);
        }
        ConfigSetCommands::Registry { network, address } => {
            println!("Setting {network} registry to: {address:?}");
            config.network_mut(network).registry = Some(address);
        }
        ConfigSetCommands::Token { network, address } => {
            println!("Setting {network} token to: {address:?}");
            config.network_mut(network).token = Some(address);
        }
        ConfigSetCommands::EntityManager { network, address } => {
            println!("Setting {network} entity manager to: {address:?}");
            config.network_mut(network).entity_manager = Some(address);
        }
        ConfigSetCommands::Keyfile { path, pw_env_var } => {
            let keyfile = EcdsaKeyfile::import(path, &pw_env_var)?;
            println!("Using keyfile {} for {:?}", keyfile.path.display(), keyfile.address);
            config.default_ecdsa_keyfile = Some(keyfile);
        }
    }
    Ok(())
}

/// Per-network settings beyond the RPC url. Unset addresses fall back to the network defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub ws_url: Option<String>,
    pub registry: Option<Address>,
    pub token: Option<Address>,
    pub entity_manager: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudiusConfig {
    /// Directory holding the config file
    #[serde(skip)]
    path: PathBuf,
    pub mainnet_rpc_url: String,
    pub sepolia_rpc_url: String,
    pub local_rpc_url: String,
    #[serde(default)]
    pub mainnet: NetworkSettings,
    #[serde(default)]
    pub sepolia: NetworkSettings,
    #[serde(default)]
    pub local: NetworkSettings,
    /// Keystore used to sign transactions
    #[serde(default)]
    pub default_ecdsa_keyfile: Option<EcdsaKeyfile>,
}

impl Default for AudiusConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CONFIG_PATH.to_owned(),
            mainnet_rpc_url: "https://eth.llamarpc.com".to_string(),
            sepolia_rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            local_rpc_url: "http://localhost:8545".to_string(),
            mainnet: NetworkSettings::default(),
            sepolia: NetworkSettings::default(),
            local: NetworkSettings::default(),
            default_ecdsa_keyfile: None,
        }
    }
}

impl AudiusConfig {
    pub fn new_at_path(path: PathBuf) -> Self {
        Self { path, ..Default::default() }
    }

    /// Loads `dir/audius-config.toml`.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config: Self = read_toml(&dir.join(CONFIG_FILE))?;
        Ok(Self { path: dir.to_path_buf(), ..config })
    }

    /// Like [`AudiusConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        match Self::load(dir) {
            Err(ConfigError::ConfigIo(e)) if e.is_not_found() => {
                Ok(Self::new_at_path(dir.to_path_buf()))
            }
            other => other,
        }
    }

    pub fn load_from_default_path() -> Result<Self, ConfigError> {
        Self::load_or_default(&DEFAULT_CONFIG_PATH)
    }

    pub fn store(&self) -> Result<(), ConfigError> {
        write_toml(&self.file(), self)?;
        Ok(())
    }

    /// The config as it is stored on disk.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn dir(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    pub fn rpc_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet_rpc_url,
            Network::Sepolia => &self.sepolia_rpc_url,
            Network::Local => &self.local_rpc_url,
        }
    }

    pub fn set_rpc_url(&mut self, network: Network, rpc_url: &str) {
        let slot = match network {
            Network::Mainnet => &mut self.mainnet_rpc_url,
            Network::Sepolia => &mut self.sepolia_rpc_url,
            Network::Local => &mut self.local_rpc_url,
        };
        *slot = rpc_url.to_owned();
    }

    pub fn network(&self, network: Network) -> &NetworkSettings {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Sepolia => &self.sepolia,
            Network::Local => &self.local,
        }
    }

    pub fn network_mut(&mut self, network: Network) -> &mut NetworkSettings {
        match network {
            Network::Mainnet => &mut self.mainnet,
            Network::Sepolia => &mut self.sepolia,
            Network::Local => &mut self.local,
        }
    }

    pub fn registry_address(&self, network: Network) -> Result<Address, AudiusError> {
        match self.network(network).registry {
            Some(address) => Ok(address),
            None => network.default_registry(),
        }
    }

    pub fn token_address(&self, network: Network) -> Result<Address, AudiusError> {
        match self.network(network).token {
            Some(address) => Ok(address),
            None => network.default_token(),
        }
    }

    pub fn keyfile(&self) -> Result<&EcdsaKeyfile, ConfigError> {
        self.default_ecdsa_keyfile.as_ref().ok_or(ConfigError::NoKeyfile)
    }
}

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    ConfigIo(#[from] IoError),
    #[error(transparent)]
    WalletFetchError(#[from] AudiusWalletError),
    #[error(transparent)]
    KeyfileError(#[from] KeyfileError),
    #[error(transparent)]
    TomlError(#[from] toml::ser::Error),
    #[error("No keyfile configured, run `audius-eth config set keyfile <PATH>` first")]
    NoKeyfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_config_is_default() {
        let dir = tempdir().unwrap();
        let config = AudiusConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.dir(), dir.path());
        assert_eq!(config.local_rpc_url, "http://localhost:8545");
        assert!(config.default_ecdsa_keyfile.is_none());
    }

    #[test]
    fn test_load_malformed_config_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "mainnet_rpc_url = ").unwrap();
        assert!(AudiusConfig::load_or_default(dir.path()).is_err());
    }

    #[test]
    fn test_set_commands_round_trip() {
        let dir = tempdir().unwrap();
        let mut config = AudiusConfig::new_at_path(dir.path().to_path_buf());
        let registry = Address::repeat_byte(0xd9);

        parse_config_subcommands(
            ConfigCommands::Set {
                command: ConfigSetCommands::Rpc {
                    network: Network::Sepolia,
                    rpc_url: "http://sepolia.example:8545".into(),
                },
            },
            &mut config,
        )
        .unwrap();
        parse_config_subcommands(
            ConfigCommands::Set {
                command: ConfigSetCommands::Registry { network: Network::Sepolia, address: registry },
            },
            &mut config,
        )
        .unwrap();

        let loaded = AudiusConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.rpc_url(Network::Sepolia), "http://sepolia.example:8545");
        assert_eq!(loaded.registry_address(Network::Sepolia).unwrap(), registry);
    }

    #[test]
    fn test_addresses_fall_back_to_network_defaults() {
        let config = AudiusConfig::default();
        assert_eq!(
            config.registry_address(Network::Mainnet).unwrap(),
            Network::Mainnet.default_registry().unwrap()
        );
        assert!(matches!(
            config.token_address(Network::Local),
            Err(AudiusError::NetworkNotConfigured { .. })
        ));
    }

    #[test]
    fn test_missing_keyfile() {
        let config = AudiusConfig::default();
        assert!(matches!(config.keyfile(), Err(ConfigError::NoKeyfile)));
    }

    #[test]
    fn test_get_prints_stored_toml() {
        let dir = tempdir().unwrap();
        let mut config = AudiusConfig::new_at_path(dir.path().to_path_buf());
        config.set_rpc_url(Network::Mainnet, "https://eth.example");
        config.store().unwrap();

        let printed = config.to_toml().unwrap();
        assert!(printed.contains("mainnet_rpc_url = \"https://eth.example\""));
        assert_eq!(printed, std::fs::read_to_string(config.file()).unwrap());
        let parsed: AudiusConfig = toml::from_str(&printed).unwrap();
        assert_eq!(parsed.rpc_url(Network::Mainnet), "https://eth.example");
    }
}
