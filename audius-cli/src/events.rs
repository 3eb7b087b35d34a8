use audius_contracts::{
    events::{fetch_logs_between, head_block, watch_contracts},
    AudiusContracts, AudiusEvent, EventSource,
};
use audius_error::AudiusProvider;
use clap::Args;
use ethers::{
    contract::LogMeta,
    types::{Filter, H256, U256, U64},
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{client::Connection, error::Error, utils::print_json_line};

#[derive(Args, Debug, Clone)]
pub struct EventsArgs {
    /// Contract to query: registry, service-provider-factory, service-type-manager, staking,
    /// delegate-manager, governance, claims-manager, token, entity-manager
    pub contract: EventSource,
    /// First block of the range
    #[arg(long)]
    pub from: u64,
    /// Last block of the range, defaults to the current head
    #[arg(long)]
    pub to: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Block to back-fill from, defaults to the current head
    #[arg(long)]
    pub from: Option<u64>,
    /// Contracts to follow, may be repeated. Defaults to every contract with a known address.
    #[arg(long = "contract")]
    pub contracts: Vec<EventSource>,
}

/// One decoded event as printed on stdout.
#[derive(Debug, Serialize)]
pub struct EventLine<'a> {
    pub block_number: U64,
    pub transaction_hash: H256,
    pub log_index: U256,
    #[serde(flatten)]
    pub event: &'a AudiusEvent,
}

impl<'a> EventLine<'a> {
    pub fn new(event: &'a AudiusEvent, meta: &LogMeta) -> Self {
        Self {
            block_number: meta.block_number,
            transaction_hash: meta.transaction_hash,
            log_index: meta.log_index,
            event,
        }
    }
}

pub async fn print_events(
    args: EventsArgs,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let client = contracts.client();
    let address = contracts.address_for(args.contract).await?;
    let to = match args.to {
        Some(block) => block,
        None => head_block(client.as_ref()).await?,
    };

    let filter = Filter::new().address(address);
    let logs = fetch_logs_between(client.as_ref(), &filter, args.from, to).await?;
    let mut printed = 0usize;
    for log in logs {
        let meta = LogMeta::from(&log);
        match args.contract.decode(log) {
            Ok(event) => {
                print_json_line(&EventLine::new(&event, &meta))?;
                printed += 1;
            }
            Err(e) => warn!("Skipping log {:?}#{}: {e}", meta.transaction_hash, meta.log_index),
        }
    }
    info!("{printed} {} events between blocks {} and {to}", args.contract, args.from);
    Ok(())
}

pub async fn watch(
    args: WatchArgs,
    connection: &Connection,
    contracts: &AudiusContracts<AudiusProvider>,
) -> Result<(), Error> {
    let targets = contracts.watch_targets(&args.contracts).await?;
    let ws = connection.ws_provider().await?;
    let from = match args.from {
        Some(block) => block,
        None => head_block(ws.as_ref()).await?,
    };

    let last_block = watch_contracts(ws, &targets, from, |event, meta| {
        print_json_line(&EventLine::new(event, meta))
    })
    .await?;
    info!("Watch ended, resume with --from {last_block}");
    Ok(())
}
