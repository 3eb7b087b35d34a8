use audius_contracts::AudiusContracts;
use audius_error::AudiusProvider;
use clap::{Parser, Subcommand};
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use audius_eth::{
    client::{Connection, ConnectionArgs},
    config::{self, AudiusConfig},
    delegation, error::Error, events, governance, service_types, sp, staking, token, tx,
    utils::print_json,
};

const DEFAULT_LOG_DIRECTIVES: &str = "audius_eth=info,audius_contracts=info";

#[derive(Parser, Debug)]
#[command(name = "audius-eth", version, about = "Command line client for the Audius Ethereum contracts")]
struct Args {
    #[command(subcommand)]
    cmd: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log level of the client, overrides RUST_LOG
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(name = "config", about = "Manage RPC urls, contract addresses and the signing keyfile")]
    Config {
        #[command(subcommand)]
        subcmd: config::ConfigCommands,
    },
    #[command(name = "contracts", about = "Print the contract addresses resolved from the registry")]
    Contracts {
        /// Also replay the registry's events from this block
        #[arg(long)]
        history_from: Option<u64>,
    },
    #[command(name = "sp", about = "Service provider endpoints, stake and pending requests")]
    Sp {
        #[command(subcommand)]
        subcmd: sp::SpCommands,
    },
    #[command(name = "delegation", about = "Delegated stake and delegation parameters")]
    Delegation {
        #[command(subcommand)]
        subcmd: delegation::DelegationCommands,
    },
    #[command(name = "staking", about = "Staked AUDIO, in total or per account")]
    Staking {
        #[command(subcommand)]
        subcmd: staking::StakingCommands,
    },
    #[command(name = "service-types", about = "Service types, stake bounds and versions")]
    ServiceTypes {
        #[command(subcommand)]
        subcmd: service_types::ServiceTypeCommands,
    },
    #[command(name = "governance", about = "Proposals, votes and governance parameters")]
    Governance {
        #[command(subcommand)]
        subcmd: governance::GovernanceCommands,
    },
    #[command(name = "token", about = "AUDIO token supply, balances and allowances")]
    Token {
        #[command(subcommand)]
        subcmd: token::TokenCommands,
    },
    #[command(name = "rewards", about = "Funding rounds and the rewards bridge")]
    Rewards {
        #[command(subcommand)]
        subcmd: token::RewardsCommands,
    },
    #[command(name = "tx", about = "Send transactions signed with the configured keyfile")]
    Tx {
        /// Send without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
        #[command(subcommand)]
        subcmd: tx::TxCommands,
    },
    #[command(name = "events", about = "Print the decoded events of a contract as JSON lines")]
    Events(events::EventsArgs),
    #[command(name = "watch", about = "Back-fill, then stream new events over a websocket")]
    Watch(events::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    _ = dotenvy::dotenv();
    let args = Args::parse();
    start_tracing(args.log_level)?;

    let mut config = AudiusConfig::load_from_default_path()?;
    run(args, &mut config).await?;
    Ok(())
}

fn start_tracing(level: Option<LevelFilter>) -> Result<(), Error> {
    let filter = match level {
        Some(level) => {
            EnvFilter::builder().parse(format!("audius_eth={level},audius_contracts={level}"))?
        }
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::builder().parse(DEFAULT_LOG_DIRECTIVES))?,
    };
    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}

fn read_only(
    args: &ConnectionArgs,
    config: &AudiusConfig,
) -> Result<(Connection, AudiusContracts<AudiusProvider>), Error> {
    let connection = Connection::resolve(args, config)?;
    debug!("Connecting to {} via {}", connection.network, connection.rpc_url);
    let contracts = connection.contracts()?;
    Ok((connection, contracts))
}

async fn run(args: Args, config: &mut AudiusConfig) -> Result<(), Error> {
    let Args { cmd, connection: connection_args, .. } = args;
    match cmd {
        Commands::Config { subcmd } => config::parse_config_subcommands(subcmd, config)?,
        Commands::Contracts { history_from } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            print_json(&contracts.resolve_all().await?)?;
            if let Some(from_block) = history_from {
                print_json(&contracts.registry().registered_contracts(from_block).await?)?;
            }
        }
        Commands::Sp { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            sp::parse_sp_subcommands(subcmd, &contracts).await?
        }
        Commands::Delegation { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            delegation::parse_delegation_subcommands(subcmd, &contracts).await?
        }
        Commands::Staking { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            staking::parse_staking_subcommands(subcmd, &contracts).await?
        }
        Commands::ServiceTypes { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            service_types::parse_service_type_subcommands(subcmd, &contracts).await?
        }
        Commands::Governance { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            governance::parse_governance_subcommands(subcmd, &contracts).await?
        }
        Commands::Token { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            token::parse_token_subcommands(subcmd, &contracts).await?
        }
        Commands::Rewards { subcmd } => {
            let (_, contracts) = read_only(&connection_args, config)?;
            token::parse_rewards_subcommands(subcmd, &contracts).await?
        }
        Commands::Tx { yes, subcmd } => {
            let connection = Connection::resolve(&connection_args, config)?;
            let contracts = connection.signer_contracts(config).await?;
            tx::parse_tx_subcommands(subcmd, &contracts, yes).await?
        }
        Commands::Events(events_args) => {
            let (_, contracts) = read_only(&connection_args, config)?;
            events::print_events(events_args, &contracts).await?
        }
        Commands::Watch(watch_args) => {
            let (connection, contracts) = read_only(&connection_args, config)?;
            events::watch(watch_args, &connection, &contracts).await?
        }
    }
    Ok(())
}
