//! Handler for liquidity-pool completion events.
//!
//! Completion permanently stamps the token with the pool address and the
//! ledger version it graduated at. The stamps and the cursor advance share
//! one transaction, so a completion racing ahead of its token's creation
//! rolls the batch back and the whole batch is retried next cycle.

use tracing::{debug, info};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::ingest::cursor::{self, EventCategory};
use crate::ingest::BatchSummary;
use crate::ledger::{PoolCompletedEvent, RawEvent};

/// Runs one ingestion cycle for completion events.
///
/// Returns `Ok(None)` when no new events exist.
///
/// # Errors
///
/// Returns [`WorkerError::TokenMissing`] (ignorable) if a completion
/// precedes its token locally, [`WorkerError::CursorMissing`] if the
/// category cursor was never seeded, or a database/ledger error for the
/// cycle.
pub async fn handle_completed(ctx: &WorkerContext) -> Result<Option<BatchSummary>, WorkerError> {
    let mut tx = ctx.db.begin().await?;

    let cursor = cursor::fetch_cursor(&mut tx, EventCategory::Completed).await?;

    let events: Vec<RawEvent<PoolCompletedEvent>> = ctx
        .ledger
        .fetch_events(
            &cursor.indexed_type(&ctx.config.module_addr),
            cursor.end_idx,
            ctx.config.batch_size,
        )
        .await?;

    if events.is_empty() {
        debug!("no new completion events");
        return Ok(None);
    }

    for event in &events {
        let completion = &event.data;

        let result = sqlx::query(
            "UPDATE tokens SET completed_at = $1, completed_tx = $2, lp_addr = $3 \
             WHERE addr = $4",
        )
        .bind(completion.timestamp())
        .bind(event.transaction_version)
        .bind(&completion.lp)
        .bind(&completion.token_address)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkerError::TokenMissing {
                address: completion.token_address.clone(),
                category: EventCategory::Completed,
            });
        }
    }

    cursor::advance_cursor(&mut tx, &cursor, events.len()).await?;

    tx.commit().await?;

    let summary = BatchSummary {
        category: EventCategory::Completed,
        from: cursor.end_idx,
        to: cursor.next_end(events.len()),
        events: events.len(),
    };

    info!(
        from = summary.from,
        to = summary.to,
        completions = summary.events,
        "completion batch committed"
    );

    Ok(Some(summary))
}
