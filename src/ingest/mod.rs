//! Event ingestion: cursors and the per-category batch handlers.
//!
//! Each handler runs one database transaction per cycle: read the
//! category's cursor, fetch a batch of events starting at its end offset,
//! apply every projected mutation together with the cursor advance, and
//! commit. A retryable miss anywhere in the batch rolls the whole
//! transaction back; the cursor does not move and the batch is re-fetched
//! on the next cycle. Replays are absorbed by natural-key upserts.
//!
//! # Components
//!
//! - [`cursor`]: per-category cursor rows
//! - [`created`]: token creation handler
//! - [`traded`]: bonding-curve trade handler
//! - [`completed`]: pool completion handler
//! - [`users`]: lazy first-seen user derivation

pub mod completed;
pub mod created;
pub mod cursor;
pub mod traded;
pub mod users;

pub use completed::handle_completed;
pub use created::handle_created;
pub use cursor::{EventCategory, EventCursor};
pub use traded::handle_traded;

/// Summary of one committed batch, used for logging and metrics.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Category the batch belonged to.
    pub category: EventCategory,
    /// Cursor offset the batch started at.
    pub from: i64,
    /// Cursor offset after the batch.
    pub to: i64,
    /// Number of events applied.
    pub events: usize,
}
