//! Raw event envelope and per-category payloads.
//!
//! Payload shapes are fixed by the launchpad Move module. Unsigned 64-bit
//! on-chain values arrive as JSON strings and are decoded into
//! [`Decimal`]; the indexer API serializes some `bigint` columns as
//! numbers and some as strings, so integer fields accept both.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One event row from the indexer's `events` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent<T> {
    /// Decoded event payload.
    pub data: T,

    /// Ledger transaction version the event was emitted at.
    #[serde(deserialize_with = "flexible_i64")]
    pub transaction_version: i64,
}

/// Payload of a `create` event: a new token and its bonding curve.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTokenEvent {
    /// Token display name.
    pub name: String,
    /// Token ticker symbol.
    pub symbol: String,
    /// Metadata image URI.
    pub uri: String,
    /// Free-form description.
    pub description: String,
    /// Twitter link, possibly empty.
    pub twitter: String,
    /// Telegram link, possibly empty.
    pub telegram: String,
    /// Website link, possibly empty.
    pub website: String,
    /// Address of the created token.
    pub token_address: String,
    /// Address of the token's bonding-curve object.
    pub bonding_curve: String,
    /// Creator account address.
    pub created_by: String,
    /// Virtual base-coin reserve at creation.
    pub virtual_aptos_reserves: Decimal,
    /// Virtual token reserve at creation; also the initial curve holding.
    pub virtual_token_reserves: Decimal,
    /// Emission timestamp in milliseconds.
    #[serde(deserialize_with = "flexible_i64")]
    pub ts: i64,
}

impl CreatedTokenEvent {
    /// Returns the emission timestamp as a UTC datetime.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        millis_to_datetime(self.ts)
    }
}

/// Payload of a `trade` event: one buy or sell against the curve.
#[derive(Debug, Clone, Deserialize)]
pub struct TradedTokenEvent {
    /// True for a buy, false for a sell.
    pub is_buy: bool,
    /// Trader account address.
    pub user: String,
    /// Address of the traded token.
    pub token_address: String,
    /// Base-coin amount moved.
    pub aptos_amount: Decimal,
    /// Token amount moved.
    pub token_amount: Decimal,
    /// Virtual base-coin reserve after the trade.
    pub virtual_aptos_reserves: Decimal,
    /// Virtual token reserve after the trade.
    pub virtual_token_reserves: Decimal,
    /// Emission timestamp in milliseconds.
    #[serde(deserialize_with = "flexible_i64")]
    pub ts: i64,
}

impl TradedTokenEvent {
    /// Returns the emission timestamp as a UTC datetime.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        millis_to_datetime(self.ts)
    }
}

/// Payload of a `complete` event: the curve graduated to a liquidity pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolCompletedEvent {
    /// Address of the liquidity pool the reserve moved to.
    pub lp: String,
    /// Address of the completed token.
    pub token_address: String,
    /// Emission timestamp in milliseconds.
    #[serde(deserialize_with = "flexible_i64")]
    pub ts: i64,
}

impl PoolCompletedEvent {
    /// Returns the emission timestamp as a UTC datetime.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        millis_to_datetime(self.ts)
    }
}

/// One row of the `current_coin_balances` holder index.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinBalance {
    /// Current balance.
    pub amount: Decimal,
    /// Holder account address.
    pub owner_address: String,
}

/// Converts an on-chain millisecond timestamp to a UTC datetime.
fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Deserializes an integer that may arrive as a JSON number or string.
fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_created_event_deserialize() {
        let json = r#"{
            "name": "Moon Cat",
            "symbol": "MCAT",
            "uri": "ipfs://QmcatQmcat",
            "description": "to the moon",
            "twitter": "",
            "telegram": "",
            "website": "https://mooncat.example",
            "token_address": "0x1a2b",
            "bonding_curve": "0xc0ffee",
            "created_by": "0xa11ce",
            "virtual_aptos_reserves": "30000000000",
            "virtual_token_reserves": "1000000000000",
            "ts": "1714003200000"
        }"#;

        let event: CreatedTokenEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.symbol, "MCAT");
        assert_eq!(
            event.virtual_token_reserves,
            Decimal::from(1_000_000_000_000_i64)
        );
        assert_eq!(event.timestamp().timestamp(), 1_714_003_200);
    }

    #[test]
    fn test_traded_event_deserialize() {
        let json = r#"{
            "is_buy": true,
            "user": "0xb0b",
            "token_address": "0x1a2b",
            "aptos_amount": "500000",
            "token_amount": "12000000",
            "virtual_aptos_reserves": "30000500000",
            "virtual_token_reserves": "999988000000",
            "ts": 1714003260000
        }"#;

        let event: TradedTokenEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_buy);
        assert_eq!(event.token_amount, Decimal::from(12_000_000_i64));
        assert_eq!(event.ts, 1_714_003_260_000);
    }

    #[test]
    fn test_completed_event_deserialize() {
        let json = r#"{"lp": "0xdead", "token_address": "0x1a2b", "ts": "1714003300000"}"#;

        let event: PoolCompletedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.lp, "0xdead");
        assert_eq!(event.token_address, "0x1a2b");
    }

    #[test]
    fn test_raw_event_version_from_string() {
        let json = r#"{"data": {"lp": "0x1", "token_address": "0x2", "ts": "0"}, "transaction_version": "987654321"}"#;

        let event: RawEvent<PoolCompletedEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(event.transaction_version, 987_654_321);
    }

    #[test]
    fn test_raw_event_version_from_number() {
        let json = r#"{"data": {"lp": "0x1", "token_address": "0x2", "ts": 0}, "transaction_version": 42}"#;

        let event: RawEvent<PoolCompletedEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(event.transaction_version, 42);
    }

    #[test]
    fn test_malformed_timestamp_falls_back_to_epoch() {
        let event = PoolCompletedEvent {
            lp: "0x1".to_string(),
            token_address: "0x2".to_string(),
            ts: i64::MAX,
        };
        assert_eq!(event.timestamp(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_coin_balance_deserialize() {
        let json = r#"{"amount": 700, "owner_address": "0xb0b"}"#;

        let balance: CoinBalance = serde_json::from_str(json).unwrap();
        assert_eq!(balance.amount, Decimal::from(700));
        assert_eq!(balance.owner_address, "0xb0b");
    }
}
