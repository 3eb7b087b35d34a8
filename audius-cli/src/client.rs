use std::sync::Arc;

use audius_contracts::{AudiusContracts, Network};
use audius_error::{AudiusError, AudiusProvider, AudiusSignerProvider, AudiusWsProvider};
use clap::Args;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider, Ws},
    signers::Signer,
    types::Address,
};
use tracing::debug;

use crate::{config::AudiusConfig, error::Error};

/// Connection options shared by every command. Flags win over environment variables, which win
/// over the config file.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Network to connect to: mainnet, sepolia, local
    #[arg(long, short, global = true, env = "AUDIUS_NETWORK", default_value = "mainnet")]
    pub network: Network,

    /// JSON-RPC url, overrides the configured url of the network
    #[arg(long, global = true, env = "ETH_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Websocket url used by `watch`
    #[arg(long, global = true, env = "ETH_WS_URL")]
    pub ws_url: Option<String>,

    /// Registry contract address
    #[arg(long, global = true, env = "ETH_REGISTRY_ADDRESS")]
    pub registry: Option<Address>,

    /// AUDIO token address
    #[arg(long, global = true, env = "ETH_TOKEN_ADDRESS")]
    pub token: Option<Address>,

    /// EntityManager address, it is not listed in the registry
    #[arg(long, global = true, env = "ETH_ENTITY_MANAGER_ADDRESS")]
    pub entity_manager: Option<Address>,
}

/// Endpoints and contract entry points after merging flags with the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub network: Network,
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub registry: Address,
    pub token: Address,
    pub entity_manager: Option<Address>,
}

impl Connection {
    pub fn resolve(args: &ConnectionArgs, config: &AudiusConfig) -> Result<Self, Error> {
        let network = args.network;
        let settings = config.network(network);
        let registry = match args.registry {
            Some(address) => address,
            None => config.registry_address(network)?,
        };
        let token = match args.token {
            Some(address) => address,
            None => config.token_address(network)?,
        };
        Ok(Self {
            network,
            rpc_url: args.rpc_url.clone().unwrap_or_else(|| config.rpc_url(network).to_owned()),
            ws_url: args.ws_url.clone().or_else(|| settings.ws_url.clone()),
            registry,
            token,
            entity_manager: args.entity_manager.or(settings.entity_manager),
        })
    }

    pub fn provider(&self) -> Result<Arc<AudiusProvider>, Error> {
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())
            .map_err(|_| Error::InvalidRpcUrl(self.rpc_url.clone()))?;
        Ok(Arc::new(provider))
    }

    pub fn contracts(&self) -> Result<AudiusContracts<AudiusProvider>, Error> {
        Ok(self.with_entity_manager(AudiusContracts::new(
            self.provider()?,
            self.registry,
            self.token,
        )))
    }

    /// Contracts bound to a signing client. Decrypts the configured keyfile.
    pub async fn signer_contracts(
        &self,
        config: &AudiusConfig,
    ) -> Result<AudiusContracts<AudiusSignerProvider>, Error> {
        let wallet = config.keyfile()?.decrypt_env()?;
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())
            .map_err(|_| Error::InvalidRpcUrl(self.rpc_url.clone()))?;
        let chain_id = provider.get_chainid().await.map_err(AudiusError::from)?;
        debug!("Signing as {:?} on chain {chain_id}", wallet.address());

        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id.as_u64()));
        Ok(self.with_entity_manager(AudiusContracts::new(
            Arc::new(client),
            self.registry,
            self.token,
        )))
    }

    pub async fn ws_provider(&self) -> Result<Arc<AudiusWsProvider>, Error> {
        let url = self.ws_url.as_deref().ok_or_else(|| Error::NoWsUrl(self.network.to_string()))?;
        let provider = Provider::<Ws>::connect(url).await.map_err(AudiusError::from)?;
        Ok(Arc::new(provider))
    }

    fn with_entity_manager<M: Middleware + 'static>(
        &self,
        contracts: AudiusContracts<M>,
    ) -> AudiusContracts<M> {
        match self.entity_manager {
            Some(address) => contracts.with_entity_manager(address),
            None => contracts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::env;

    const CONNECTION_ENV_VARS: [&str; 6] = [
        "AUDIUS_NETWORK",
        "ETH_RPC_URL",
        "ETH_WS_URL",
        "ETH_REGISTRY_ADDRESS",
        "ETH_TOKEN_ADDRESS",
        "ETH_ENTITY_MANAGER_ADDRESS",
    ];

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        connection: ConnectionArgs,
    }

    /// Connection flags fall back to the environment, so a developer's shell must not leak in.
    fn clear_env() {
        for var in CONNECTION_ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_flags_override_config() {
        clear_env();
        let mut config = AudiusConfig::default();
        config.network_mut(Network::Local).registry = Some(Address::repeat_byte(0x01));
        config.network_mut(Network::Local).token = Some(Address::repeat_byte(0x02));
        config.network_mut(Network::Local).ws_url = Some("ws://localhost:8546".into());

        let cli = TestCli::parse_from([
            "test",
            "--network",
            "local",
            "--rpc-url",
            "http://anvil:8545",
            "--token",
            "0x0303030303030303030303030303030303030303",
        ]);
        let connection = Connection::resolve(&cli.connection, &config).unwrap();

        assert_eq!(connection.network, Network::Local);
        assert_eq!(connection.rpc_url, "http://anvil:8545");
        assert_eq!(connection.registry, Address::repeat_byte(0x01));
        assert_eq!(connection.token, Address::repeat_byte(0x03));
        assert_eq!(connection.ws_url.as_deref(), Some("ws://localhost:8546"));
        assert!(connection.entity_manager.is_none());
    }

    #[test]
    #[serial]
    fn test_unconfigured_network_fails() {
        clear_env();
        let cli = TestCli::parse_from(["test", "--network", "sepolia"]);
        let err = Connection::resolve(&cli.connection, &AudiusConfig::default()).unwrap_err();
        assert!(matches!(err, Error::AudiusError(AudiusError::NetworkNotConfigured { .. })));
    }

    #[test]
    #[serial]
    fn test_env_between_flags_and_config() {
        clear_env();
        env::set_var("AUDIUS_NETWORK", "local");
        env::set_var("ETH_REGISTRY_ADDRESS", "0x0404040404040404040404040404040404040404");
        env::set_var("ETH_TOKEN_ADDRESS", "0x0505050505050505050505050505050505050505");
        let mut config = AudiusConfig::default();
        config.network_mut(Network::Local).registry = Some(Address::repeat_byte(0x01));

        let cli = TestCli::parse_from([
            "test",
            "--token",
            "0x0606060606060606060606060606060606060606",
        ]);
        let connection = Connection::resolve(&cli.connection, &config).unwrap();
        clear_env();

        assert_eq!(connection.network, Network::Local);
        assert_eq!(connection.registry, Address::repeat_byte(0x04));
        assert_eq!(connection.token, Address::repeat_byte(0x06));
        assert_eq!(connection.rpc_url, config.rpc_url(Network::Local));
    }
}
