//! Transaction summaries fed into the classifier

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk_detection::errors::{MonitorError, Result};

/// Transaction summary as delivered by the ingestion feed
///
/// Field names follow the feed's camelCase JSON; the snake_case spellings used
/// by older producers are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    /// Transaction hash, treated as an opaque identifier
    #[serde(default, alias = "tx_hash")]
    pub hash: String,

    #[serde(default, alias = "from_address", alias = "from")]
    pub from_address: Option<String>,

    #[serde(default, alias = "to_address", alias = "to")]
    pub to_address: Option<String>,

    /// Transferred value in native units (ETH)
    #[serde(default)]
    pub value: Decimal,

    #[serde(default, alias = "decoded_function")]
    pub decoded_function: Option<String>,

    /// Raw calldata, hex-like
    #[serde(default, alias = "input_data")]
    pub input_data: Option<String>,

    #[serde(default, alias = "block_number")]
    pub block_number: Option<u64>,

    /// Gas price in Gwei
    #[serde(default, alias = "gas_price")]
    pub gas_price: Option<Decimal>,
}

impl TransactionSummary {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            ..Self::default()
        }
    }

    pub fn with_function(mut self, decoded_function: impl Into<String>) -> Self {
        self.decoded_function = Some(decoded_function.into());
        self
    }

    pub fn with_input(mut self, input_data: impl Into<String>) -> Self {
        self.input_data = Some(input_data.into());
        self
    }

    pub fn with_addresses(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from_address = from;
        self.to_address = to;
        self
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }

    pub fn with_network(mut self, block_number: Option<u64>, gas_price: Option<Decimal>) -> Self {
        self.block_number = block_number;
        self.gas_price = gas_price;
        self
    }

    /// Reject summaries that must never reach the classifier
    pub fn validate(&self) -> Result<()> {
        if self.hash.trim().is_empty() {
            return Err(MonitorError::MalformedInput(
                "transaction hash is required".to_string(),
            ));
        }

        if self.value.is_sign_negative() && !self.value.is_zero() {
            return Err(MonitorError::MalformedInput(format!(
                "value must be non-negative, got {}",
                self.value
            )));
        }

        if let Some(gas) = self.gas_price {
            if gas.is_sign_negative() && !gas.is_zero() {
                return Err(MonitorError::MalformedInput(format!(
                    "gas price must be non-negative, got {}",
                    gas
                )));
            }
        }

        Ok(())
    }

    /// Shortened hash for log fields
    pub fn short_hash(&self) -> &str {
        short_hash(&self.hash)
    }
}

pub(crate) fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(10) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_missing_hash_is_rejected() {
        let summary = TransactionSummary::default().with_function("withdraw()");
        let err = summary.validate().unwrap_err();
        assert!(matches!(err, MonitorError::MalformedInput(_)));

        let blank = TransactionSummary::new("   ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_negative_amounts_are_rejected() {
        let summary = TransactionSummary::new("0xabc").with_value(Decimal::from_str("-1.5").unwrap());
        assert!(summary.validate().is_err());

        let summary = TransactionSummary::new("0xabc")
            .with_network(Some(1), Some(Decimal::from_str("-3").unwrap()));
        assert!(summary.validate().is_err());

        let ok = TransactionSummary::new("0xabc").with_value(Decimal::from_str("1.5").unwrap());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_deserialize_feed_payload() {
        let json = r#"{
            "hash": "0x123",
            "fromAddress": "0xabc",
            "value": "1.5",
            "decodedFunction": "withdraw()",
            "inputData": "0x3ccfd60b",
            "blockNumber": 19000000,
            "gasPrice": 32.5
        }"#;
        let summary: TransactionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.hash, "0x123");
        assert_eq!(summary.value, Decimal::from_str("1.5").unwrap());
        assert_eq!(summary.block_number, Some(19_000_000));
        assert_eq!(summary.decoded_function.as_deref(), Some("withdraw()"));
    }

    #[test]
    fn test_deserialize_snake_case_aliases() {
        let json = r#"{"tx_hash": "0x9", "decoded_function": "transfer(address,uint256)", "input_data": "0xa9059cbb"}"#;
        let summary: TransactionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.hash, "0x9");
        assert_eq!(summary.input_data.as_deref(), Some("0xa9059cbb"));
        assert!(summary.value.is_zero());
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0x1234567890abcdef"), "0x12345678");
        assert_eq!(short_hash("0x12"), "0x12");
    }
}
