//! Worker error types and severity classification.
//!
//! [`WorkerError`] is the central error type for the ingestion and
//! reconciliation paths. The orchestrator never inspects error internals;
//! it only asks [`WorkerError::is_ignorable`] and [`WorkerError::is_fatal`]
//! to decide between retrying quietly, logging loudly, and shutting down.

use crate::ingest::EventCategory;
use crate::ledger::LedgerError;

/// Errors produced by the ingestion handlers and the holder reconciler.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The cursor row for a category is missing from `worker_indexes`.
    ///
    /// Cursor rows are seeded by migration; a missing row means the database
    /// was not migrated for this deployment. The process exits.
    #[error("cursor row missing for {category} events")]
    CursorMissing {
        /// Category whose cursor row was not found.
        category: EventCategory,
    },

    /// A trade or completion referenced a token that has not been created
    /// locally yet. The enclosing batch rolls back and is retried once the
    /// created-event handler catches up.
    #[error("token {address} not indexed yet ({category} event)")]
    TokenMissing {
        /// Address of the token the event referenced.
        address: String,
        /// Category of the event that hit the miss.
        category: EventCategory,
    },

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure at startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Ledger indexer API failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl WorkerError {
    /// Returns true if the error is an expected upstream race that the next
    /// cycle resolves on its own. Ignorable errors are logged at low
    /// severity and never escalated.
    #[must_use]
    pub const fn is_ignorable(&self) -> bool {
        matches!(self, Self::TokenMissing { .. })
    }

    /// Returns true if the error is a configuration defect that retrying
    /// cannot fix. Fatal errors abort the worker loop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::CursorMissing { .. } | Self::Migration(_))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_token_missing_is_ignorable() {
        let err = WorkerError::TokenMissing {
            address: "0xabc".to_string(),
            category: EventCategory::Traded,
        };
        assert!(err.is_ignorable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_cursor_missing_is_fatal() {
        let err = WorkerError::CursorMissing {
            category: EventCategory::Created,
        };
        assert!(err.is_fatal());
        assert!(!err.is_ignorable());
    }

    #[test]
    fn test_ledger_error_is_neither() {
        let err = WorkerError::Ledger(LedgerError::Graphql("boom".to_string()));
        assert!(!err.is_ignorable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_display_includes_address() {
        let err = WorkerError::TokenMissing {
            address: "0xabc".to_string(),
            category: EventCategory::Completed,
        };
        let message = err.to_string();
        assert!(message.contains("0xabc"));
        assert!(message.contains("completed"));
    }
}
