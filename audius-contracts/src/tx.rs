use audius_error::{AudiusError, Result};
use ethers::{
    abi::Detokenize,
    contract::{parse_log, ContractCall, EthEvent},
    providers::Middleware,
    types::{Address, Filter, TransactionReceipt, H256, U256, U64},
};
use tracing::{debug, info};

/// Sends a state-changing call and waits for it to be mined. A dropped transaction or a receipt
/// with status 0 is an error, so callers only ever see successful receipts.
pub async fn send_and_confirm<M, D>(
    call: ContractCall<M, D>,
    what: &str,
) -> Result<TransactionReceipt>
where
    M: Middleware + 'static,
    D: Detokenize,
{
    let pending = call.send().await?;
    let tx_hash = *pending;
    info!("{what}: submitted {tx_hash:?}");

    let receipt = pending.await?.ok_or(AudiusError::NoReceipt(tx_hash))?;
    if receipt.status == Some(U64::zero()) {
        return Err(AudiusError::TransactionFailed(tx_hash));
    }
    debug!("{what}: mined in block {:?}, gas used {:?}", receipt.block_number, receipt.gas_used);
    Ok(receipt)
}

/// First `E` emitted in the receipt.
pub fn find_event<E: EthEvent>(receipt: &TransactionReceipt) -> Result<E> {
    events_in(receipt)
        .into_iter()
        .next()
        .ok_or_else(|| AudiusError::MissingEvent(E::name().into_owned()))
}

pub fn events_in<E: EthEvent>(receipt: &TransactionReceipt) -> Vec<E> {
    let signature = E::signature();
    receipt
        .logs
        .iter()
        .filter(|log| log.topics.first() == Some(&signature))
        .filter_map(|log| parse_log::<E>(log.clone()).ok())
        .collect()
}

pub fn address_topic(address: Address) -> H256 {
    H256::from(address)
}

pub fn uint_topic(value: U256) -> H256 {
    let mut raw = [0u8; 32];
    value.to_big_endian(&mut raw);
    H256(raw)
}

pub fn bytes32_topic(value: [u8; 32]) -> H256 {
    H256(value)
}

/// Narrows `filter` on the indexed event arguments that are set. Position `i` of `topics` is the
/// `i`-th indexed argument of the event.
pub fn with_topics(mut filter: Filter, topics: [Option<H256>; 3]) -> Filter {
    let [first, second, third] = topics;
    if let Some(topic) = first {
        filter = filter.topic1(topic);
    }
    if let Some(topic) = second {
        filter = filter.topic2(topic);
    }
    if let Some(topic) = third {
        filter = filter.topic3(topic);
    }
    filter
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bindings::staking::{SlashedFilter, StakedFilter};
    use ethers::{
        abi::{self, Token},
        types::{Log, ValueOrArray},
    };

    pub(crate) fn log_with(topics: Vec<H256>, data: Vec<Token>) -> Log {
        Log { topics, data: abi::encode(&data).into(), ..Default::default() }
    }

    /// Fills in the block metadata a log carries once it is mined.
    pub(crate) fn mined(log: Log, block: u64) -> Log {
        Log {
            block_number: Some(block.into()),
            block_hash: Some(H256::repeat_byte(block as u8)),
            transaction_hash: Some(H256::from_low_u64_be(block)),
            transaction_index: Some(0u64.into()),
            log_index: Some(U256::zero()),
            ..log
        }
    }

    fn staked_log(user: Address, amount: u64, total: u64) -> Log {
        log_with(
            vec![StakedFilter::signature(), address_topic(user)],
            vec![Token::Uint(amount.into()), Token::Uint(total.into())],
        )
    }

    #[test]
    fn test_find_event_in_receipt() {
        let user = Address::repeat_byte(0x11);
        let receipt = TransactionReceipt {
            logs: vec![Log::default(), staked_log(user, 10, 110)],
            ..Default::default()
        };
        let staked: StakedFilter = find_event(&receipt).unwrap();
        assert_eq!(staked.user, user);
        assert_eq!(staked.amount, U256::from(10));
        assert_eq!(staked.total, U256::from(110));
    }

    #[test]
    fn test_missing_event() {
        let receipt = TransactionReceipt {
            logs: vec![staked_log(Address::zero(), 1, 1)],
            ..Default::default()
        };
        match find_event::<SlashedFilter>(&receipt) {
            Err(AudiusError::MissingEvent(name)) => assert_eq!(name, "Slashed"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_topic_encoding() {
        let address = Address::repeat_byte(0xab);
        let topic = address_topic(address);
        assert_eq!(&topic.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(&topic.as_bytes()[12..], address.as_bytes());

        let topic = uint_topic(U256::from(258));
        assert_eq!(topic.as_bytes()[30..], [1, 2]);
    }

    #[test]
    fn test_with_topics_skips_unset() {
        let id = uint_topic(U256::from(7));
        let filter = with_topics(Filter::new(), [None, Some(id), None]);
        assert!(filter.topics[1].is_none());
        assert_eq!(filter.topics[2], Some(ValueOrArray::Value(Some(id))));
        assert!(filter.topics[3].is_none());
    }
}
