//! Per-category event cursors.
//!
//! One `worker_indexes` row per event category records how far into that
//! category's stream the indexer has consumed: `end_idx` is the number of
//! events already applied (and the fetch offset of the next batch), and
//! `start_idx` mirrors the previous `end_idx` for audit. The rows are
//! seeded by migration and only ever updated inside the transaction of the
//! batch they guard.

use sqlx::PgConnection;

use crate::error::WorkerError;

/// The three event categories tracked by independent cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Token creation events.
    Created,
    /// Bonding-curve trade events.
    Traded,
    /// Liquidity-pool completion events.
    Completed,
}

impl EventCategory {
    /// Returns the category's `worker_indexes` row id.
    #[must_use]
    pub const fn cursor_id(self) -> i16 {
        match self {
            Self::Created => 1,
            Self::Traded => 2,
            Self::Completed => 3,
        }
    }

    /// Returns a human-readable category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Traded => "traded",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cursor row of `worker_indexes`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventCursor {
    /// Row id; matches [`EventCategory::cursor_id`].
    pub id: i16,
    /// On-chain event name of the category (e.g. `trade`).
    pub event: String,
    /// End offset of the previously committed batch.
    pub start_idx: i64,
    /// Number of events consumed so far; fetch offset of the next batch.
    pub end_idx: i64,
}

impl EventCursor {
    /// Returns the fully-qualified event type the ledger filter expects.
    #[must_use]
    pub fn indexed_type(&self, module_addr: &str) -> String {
        format!("{module_addr}::pump::{}", self.event)
    }

    /// Returns the end offset after committing a batch of `batch_len`
    /// events.
    #[must_use]
    pub const fn next_end(&self, batch_len: usize) -> i64 {
        self.end_idx + batch_len as i64
    }
}

/// Reads the cursor row for a category.
///
/// # Errors
///
/// Returns [`WorkerError::CursorMissing`] if the row was never seeded,
/// or [`WorkerError::Database`] on query failure.
pub async fn fetch_cursor(
    conn: &mut PgConnection,
    category: EventCategory,
) -> Result<EventCursor, WorkerError> {
    sqlx::query_as::<_, EventCursor>(
        "SELECT id, event, start_idx, end_idx FROM worker_indexes WHERE id = $1",
    )
    .bind(category.cursor_id())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(WorkerError::CursorMissing { category })
}

/// Advances the cursor past a committed batch. Must run inside the same
/// transaction as the batch's mutations.
///
/// # Errors
///
/// Returns [`WorkerError::Database`] on query failure.
pub async fn advance_cursor(
    conn: &mut PgConnection,
    cursor: &EventCursor,
    batch_len: usize,
) -> Result<(), WorkerError> {
    sqlx::query("UPDATE worker_indexes SET start_idx = $1, end_idx = $2 WHERE id = $3")
        .bind(cursor.end_idx)
        .bind(cursor.next_end(batch_len))
        .bind(cursor.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn cursor(end_idx: i64) -> EventCursor {
        EventCursor {
            id: 2,
            event: "trade".to_string(),
            start_idx: 0,
            end_idx,
        }
    }

    #[test]
    fn test_cursor_ids_are_distinct() {
        assert_eq!(EventCategory::Created.cursor_id(), 1);
        assert_eq!(EventCategory::Traded.cursor_id(), 2);
        assert_eq!(EventCategory::Completed.cursor_id(), 3);
    }

    #[test]
    fn test_indexed_type() {
        let cursor = cursor(0);
        assert_eq!(cursor.indexed_type("0xfeed"), "0xfeed::pump::trade");
    }

    #[test]
    fn test_next_end_advances_by_batch_len() {
        let cursor = cursor(120);
        assert_eq!(cursor.next_end(0), 120);
        assert_eq!(cursor.next_end(1000), 1120);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(EventCategory::Completed.to_string(), "completed");
    }
}
