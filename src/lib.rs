//! Off-chain event indexer for the Pump bonding-curve launchpad.
//!
//! The indexer tails the launchpad's on-chain event stream (token creation,
//! bonding-curve trades, liquidity-pool completion) and projects it into a
//! PostgreSQL schema consumed by the web application. Each event category is
//! tracked by an independent cursor; a batch of events and its cursor advance
//! are applied as one transaction, so a batch either lands completely or not
//! at all and is retried on the next poll cycle.
//!
//! # Components
//!
//! - [`config`]: environment-driven configuration
//! - [`context`]: shared handles (database pool, ledger client, metrics)
//! - [`ledger`]: GraphQL client for the chain indexer API
//! - [`ingest`]: cursors and the per-category batch handlers
//! - [`reconcile`]: background holder-balance reconciliation
//! - [`worker`]: the poll loop driving the handlers

pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod metrics;
pub mod reconcile;
pub mod worker;

pub use config::IndexerConfig;
pub use context::WorkerContext;
pub use error::WorkerError;
pub use metrics::WorkerMetrics;
pub use worker::Worker;
