//! Access to the chain indexer API.
//!
//! The ledger is consumed through its hosted GraphQL indexer: the `events`
//! table provides the category-filtered event stream the ingestion handlers
//! tail, and `current_coin_balances` provides the authoritative holder
//! snapshot used by reconciliation.
//!
//! # Components
//!
//! - [`types`]: raw event envelope and per-category payloads
//! - [`client`]: the GraphQL client
//! - [`error`]: ledger error type

pub mod client;
pub mod error;
pub mod types;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use types::{
    CoinBalance, CreatedTokenEvent, PoolCompletedEvent, RawEvent, TradedTokenEvent,
};
