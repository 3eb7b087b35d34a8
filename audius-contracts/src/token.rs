use std::{ops::Deref, sync::Arc};

use audius_error::Result;
use ethers::{
    contract::{EthEvent, LogMeta},
    providers::Middleware,
    types::{Address, Filter, TransactionReceipt, U256},
    utils,
};
use serde::{Deserialize, Serialize};

use crate::{
    bindings::{audius_token::TransferFilter, AudiusTokenAbi},
    events::fetch_events_between,
    tx::{address_topic, send_and_confirm, with_topics},
};

pub const AUDIO_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

#[derive(Clone, Debug)]
pub struct AudiusToken<M: Middleware> {
    inner: AudiusTokenAbi<M>,
}

impl<M: Middleware> Deref for AudiusToken<M> {
    type Target = AudiusTokenAbi<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Middleware + 'static> AudiusToken<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { inner: AudiusTokenAbi::new(address, client) }
    }

    pub async fn token_info(&self) -> Result<TokenInfo> {
        let (name, symbol, decimals, total_supply) =
            (self.name(), self.symbol(), self.decimals(), self.total_supply());
        let (name, symbol, decimals, total_supply) = futures::try_join!(
            name.call(),
            symbol.call(),
            decimals.call(),
            total_supply.call(),
        )?;
        Ok(TokenInfo { address: self.address(), name, symbol, decimals, total_supply })
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.inner.balance_of(account).call().await?)
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        Ok(self.inner.allowance(owner, spender).call().await?)
    }

    /// Approves `spender` for `amount` and waits for the approval to be mined. Staking pulls the
    /// tokens with `transferFrom`, so every stake-moving transaction needs this first.
    pub async fn approve_and_wait(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionReceipt> {
        send_and_confirm(self.approve(spender, amount), "approve").await
    }

    pub async fn transfer_events(
        &self,
        from: Option<Address>,
        to: Option<Address>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<(TransferFilter, LogMeta)>> {
        let filter = with_topics(
            Filter::new().address(self.address()).topic0(TransferFilter::signature()),
            [from.map(address_topic), to.map(address_topic), None],
        );
        fetch_events_between(self.client().as_ref(), &filter, from_block, to_block).await
    }
}

/// Renders a token amount with `decimals` places, dropping trailing zeros: `1.5`, not
/// `1.500000000000000000`.
pub fn format_units(amount: U256, decimals: u32) -> Result<String> {
    let formatted = utils::format_units(amount, decimals)?;
    Ok(match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_owned()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    })
}

pub fn format_audio(amount: U256) -> Result<String> {
    format_units(amount, AUDIO_DECIMALS)
}

/// Parses a human amount such as `"1500.25"` into AUDIO wei.
pub fn parse_audio(amount: &str) -> Result<U256> {
    Ok(utils::parse_units(amount.trim(), AUDIO_DECIMALS)?.into())
}
