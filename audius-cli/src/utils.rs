use audius_contracts::token::{format_audio, parse_audio};
use ethers::types::{TransactionReceipt, U256};
use serde::Serialize;

use crate::error::Error;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Single-line JSON, for streams that other tools consume line by line.
pub fn print_json_line<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn parse_amount(amount: &str) -> Result<U256, Error> {
    parse_audio(amount).map_err(|_| Error::InvalidAmount(amount.to_owned()))
}

/// `1500.5 AUDIO`, falling back to raw wei if the amount cannot be rendered.
pub fn audio(amount: U256) -> String {
    match format_audio(amount) {
        Ok(formatted) => format!("{formatted} AUDIO"),
        Err(_) => format!("{amount} wei"),
    }
}

pub fn print_receipt(what: &str, receipt: &TransactionReceipt) {
    println!(
        "{what}: {:?} mined in block {}",
        receipt.transaction_hash,
        receipt.block_number.map(|b| b.to_string()).unwrap_or_else(|| "?".into())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("2.5").unwrap(), U256::exp10(18) * 5 / 2);
        assert!(matches!(parse_amount("two"), Err(Error::InvalidAmount(a)) if a == "two"));
    }

    #[test]
    fn test_audio() {
        assert_eq!(audio(U256::exp10(18) * 200_000), "200000 AUDIO");
    }
}
