use std::{pin::Pin, sync::Arc};

use audius_error::{AudiusError, AudiusWsProvider, Result};
use ethers::{
    abi,
    contract::{parse_log, ContractError, EthLogDecode, LogMeta},
    providers::Middleware,
    types::{Address, Filter, Log},
};
use futures::{stream::SelectAll, Stream, StreamExt};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

use crate::{
    bindings::{
        AudiusTokenAbiEvents, ClaimsManagerAbiEvents, DelegateManagerAbiEvents,
        EntityManagerAbiEvents, GovernanceAbiEvents, RegistryAbiEvents,
        ServiceProviderFactoryAbiEvents, ServiceTypeManagerAbiEvents, StakingAbiEvents,
    },
    key::ContractKey,
};

/// Block window of a single `eth_getLogs` request.
pub const PAGE_SIZE: u64 = 50_000;

pub type EthersStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Contracts whose events can be queried or watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventSource {
    Registry,
    #[strum(to_string = "service-provider-factory", serialize = "sp-factory", serialize = "sp")]
    ServiceProviderFactory,
    #[strum(to_string = "service-type-manager", serialize = "service-types")]
    ServiceTypeManager,
    Staking,
    #[strum(to_string = "delegate-manager", serialize = "delegation")]
    DelegateManager,
    Governance,
    #[strum(to_string = "claims-manager", serialize = "claims")]
    ClaimsManager,
    Token,
    EntityManager,
}

impl EventSource {
    /// Registry entry the source is resolved from. The token and the entity manager are not
    /// registered and need an explicit address.
    pub fn contract_key(&self) -> Option<ContractKey> {
        match self {
            EventSource::ServiceProviderFactory => Some(ContractKey::ServiceProviderFactory),
            EventSource::ServiceTypeManager => Some(ContractKey::ServiceTypeManagerProxy),
            EventSource::Staking => Some(ContractKey::StakingProxy),
            EventSource::DelegateManager => Some(ContractKey::DelegateManager),
            EventSource::Governance => Some(ContractKey::Governance),
            EventSource::ClaimsManager => Some(ContractKey::ClaimsManagerProxy),
            EventSource::Registry | EventSource::Token | EventSource::EntityManager => None,
        }
    }

    pub fn decode(&self, log: Log) -> std::result::Result<AudiusEvent, abi::Error> {
        Ok(match self {
            EventSource::Registry => AudiusEvent::Registry(parse_log(log)?),
            EventSource::ServiceProviderFactory => {
                AudiusEvent::ServiceProviderFactory(parse_log(log)?)
            }
            EventSource::ServiceTypeManager => AudiusEvent::ServiceTypeManager(parse_log(log)?),
            EventSource::Staking => AudiusEvent::Staking(parse_log(log)?),
            EventSource::DelegateManager => AudiusEvent::DelegateManager(parse_log(log)?),
            EventSource::Governance => AudiusEvent::Governance(parse_log(log)?),
            EventSource::ClaimsManager => AudiusEvent::ClaimsManager(parse_log(log)?),
            EventSource::Token => AudiusEvent::Token(parse_log(log)?),
            EventSource::EntityManager => AudiusEvent::EntityManager(parse_log(log)?),
        })
    }
}

/// Any event emitted by one of the Audius contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "contract", content = "event", rename_all = "kebab-case")]
pub enum AudiusEvent {
    Registry(RegistryAbiEvents),
    ServiceProviderFactory(ServiceProviderFactoryAbiEvents),
    ServiceTypeManager(ServiceTypeManagerAbiEvents),
    Staking(StakingAbiEvents),
    DelegateManager(DelegateManagerAbiEvents),
    Governance(GovernanceAbiEvents),
    ClaimsManager(ClaimsManagerAbiEvents),
    Token(AudiusTokenAbiEvents),
    EntityManager(EntityManagerAbiEvents),
}

/// Item of a merged live stream. Logs that fail to decode are surfaced rather than dropped so the
/// consumer can decide whether to restart.
#[derive(Debug)]
pub enum StreamEvent {
    Event(Box<(AudiusEvent, LogMeta)>),
    Error(String),
}

/// Contract address paired with the kind of events it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTarget {
    pub source: EventSource,
    pub address: Address,
}

impl WatchTarget {
    pub fn new(source: EventSource, address: Address) -> Self {
        Self { source, address }
    }

    fn filter(&self) -> Filter {
        Filter::new().address(self.address)
    }

    fn to_stream_event(&self, log: Log) -> StreamEvent {
        let meta = LogMeta::from(&log);
        match self.source.decode(log) {
            Ok(event) => StreamEvent::Event(Box::new((event, meta))),
            Err(e) => StreamEvent::Error(format!(
                "{} log {:?}#{} could not be decoded: {e}",
                self.source, meta.transaction_hash, meta.log_index
            )),
        }
    }
}

pub(crate) fn middleware_error<M: Middleware>(e: M::Error) -> AudiusError {
    ContractError::<M>::MiddlewareError { e }.into()
}

pub async fn head_block<M: Middleware>(client: &M) -> Result<u64> {
    Ok(client.get_block_number().await.map_err(middleware_error::<M>)?.as_u64())
}

/// Pages `eth_getLogs` for `filter` over `[start, end]` in windows of [`PAGE_SIZE`] blocks.
pub async fn fetch_logs_between<M: Middleware>(
    client: &M,
    filter: &Filter,
    start: u64,
    end: u64,
) -> Result<Vec<Log>> {
    let mut logs = Vec::new();
    let mut from = start;
    while from <= end {
        let to = end.min(from.saturating_add(PAGE_SIZE - 1));
        debug!("Fetching logs between {from} and {to}");
        let page = filter.clone().from_block(from).to_block(to);
        let batch = client.get_logs(&page).await.map_err(middleware_error::<M>)?;
        logs.extend(batch);
        match to.checked_add(1) {
            Some(next) => from = next,
            None => break,
        }
    }
    Ok(logs)
}

/// Historic events matching `filter`, decoded as `E`. Logs that do not decode are logged and
/// skipped.
pub async fn fetch_events_between<M, E>(
    client: &M,
    filter: &Filter,
    start: u64,
    end: u64,
) -> Result<Vec<(E, LogMeta)>>
where
    M: Middleware,
    E: EthLogDecode,
{
    let logs = fetch_logs_between(client, filter, start, end).await?;
    let total = logs.len();
    let events: Vec<(E, LogMeta)> = logs
        .into_iter()
        .filter_map(|log| {
            let meta = LogMeta::from(&log);
            match parse_log::<E>(log) {
                Ok(event) => Some((event, meta)),
                Err(e) => {
                    warn!("Skipping log {:?}#{}: {e}", meta.transaction_hash, meta.log_index);
                    None
                }
            }
        })
        .collect();

    debug!("Decoded {} of {total} logs between {start} and {end}", events.len());
    Ok(events)
}

/// Merges any number of event streams into one.
pub struct CombinedWsPool<'a, T> {
    merge: SelectAll<EthersStream<'a, T>>,
}

impl<'a, T: 'a> CombinedWsPool<'a, T> {
    pub fn new() -> Self {
        Self { merge: SelectAll::new() }
    }

    pub fn add<A: 'a>(&mut self, s: EthersStream<'a, A>)
    where
        T: From<A>,
    {
        let new_stream = s.map(T::from);
        self.merge.push(Box::pin(new_stream) as EthersStream<'a, T>);
    }

    pub fn len(&self) -> usize {
        self.merge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merge.is_empty()
    }

    pub async fn next(&mut self) -> Option<T> {
        self.merge.next().await
    }
}

impl<'a, T: 'a> Default for CombinedWsPool<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Live logs that are not already covered by a back-fill up to `head`. Logs removed by a reorg
/// and pending logs without a block are dropped.
fn is_live(log: &Log, head: u64) -> bool {
    log.removed != Some(true) && log.block_number.is_some_and(|block| block.as_u64() > head)
}

/// Decoded events of every target between `from_block` and `to_block`, ordered by block and log
/// index across contracts. Removed and undecodable logs are skipped.
pub async fn backfill<M: Middleware>(
    client: &M,
    targets: &[WatchTarget],
    from_block: u64,
    to_block: u64,
) -> Result<Vec<(AudiusEvent, LogMeta)>> {
    let mut backlog = Vec::new();
    for target in targets {
        for log in fetch_logs_between(client, &target.filter(), from_block, to_block).await? {
            if log.removed == Some(true) {
                continue;
            }
            match target.to_stream_event(log) {
                StreamEvent::Event(event) => backlog.push(*event),
                StreamEvent::Error(e) => warn!("{e}"),
            }
        }
    }
    backlog.sort_by_key(|(_, meta)| (meta.block_number, meta.log_index));
    Ok(backlog)
}

/// Back-fills every target from `from_block` to the current head, then follows new events over
/// the websocket. `handler` sees events in block order and its first error stops the watch.
/// Returns the last block handled once the subscription ends, which is where a restarted watcher
/// should resume.
///
/// Subscriptions are opened before the head is read, so every block after the back-fill reaches
/// the live stream. Live logs at or below the back-filled head are dropped as duplicates.
pub async fn watch_contracts<F, E>(
    client: Arc<AudiusWsProvider>,
    targets: &[WatchTarget],
    from_block: u64,
    mut handler: F,
) -> std::result::Result<u64, E>
where
    F: FnMut(&AudiusEvent, &LogMeta) -> std::result::Result<(), E>,
    E: From<AudiusError>,
{
    if targets.is_empty() {
        return Err(AudiusError::NothingToWatch.into());
    }

    let mut pool: CombinedWsPool<(WatchTarget, Log)> = CombinedWsPool::new();
    for target in targets.iter().copied() {
        let logs = client.subscribe_logs(&target.filter()).await.map_err(AudiusError::from)?;
        debug!("Subscribed to {} at {:?}", target.source, target.address);
        pool.add(Box::pin(logs.map(move |log| (target, log))) as EthersStream<'_, _>);
    }

    let head = head_block(client.as_ref()).await?;
    info!("Back-filling {} contracts from block {from_block} to {head}", targets.len());
    let backlog = backfill(client.as_ref(), targets, from_block, head).await?;
    for (event, meta) in &backlog {
        handler(event, meta)?;
    }
    info!("Back-filled {} events", backlog.len());

    let mut latest_block = head;
    info!("Listening for new events on {} contracts", pool.len());
    while let Some((target, log)) = pool.next().await {
        if !is_live(&log, head) {
            let tx = log.transaction_hash;
            debug!("Dropping {} log {tx:?}: removed or back-filled", target.source);
            continue;
        }
        match target.to_stream_event(log) {
            StreamEvent::Event(event) => {
                let (event, meta) = *event;
                handler(&event, &meta)?;
                latest_block = latest_block.max(meta.block_number.as_u64());
            }
            StreamEvent::Error(e) => warn!("{e}"),
        }
    }

    warn!("Event subscription closed at block {latest_block}");
    Ok(latest_block)
}
