//! Handler for token creation events.
//!
//! Each created token becomes a `tokens` row, a first-seen `users` row for
//! its creator, and a `holders` row crediting the launchpad module address
//! with the full initial reserve (the module holds every token's unsold
//! supply until the pool completes).

use tracing::{debug, info};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::ingest::cursor::{self, EventCategory};
use crate::ingest::users::{derive_users, insert_users};
use crate::ingest::BatchSummary;
use crate::ledger::{CreatedTokenEvent, RawEvent};

/// Runs one ingestion cycle for creation events.
///
/// Returns `Ok(None)` when no new events exist. All mutations and the
/// cursor advance commit together; on any error the transaction rolls
/// back and the batch is retried next cycle.
///
/// # Errors
///
/// Returns [`WorkerError::CursorMissing`] if the category cursor was never
/// seeded, or a database/ledger error for the cycle.
pub async fn handle_created(ctx: &WorkerContext) -> Result<Option<BatchSummary>, WorkerError> {
    let mut tx = ctx.db.begin().await?;

    let cursor = cursor::fetch_cursor(&mut tx, EventCategory::Created).await?;

    let events: Vec<RawEvent<CreatedTokenEvent>> = ctx
        .ledger
        .fetch_events(
            &cursor.indexed_type(&ctx.config.module_addr),
            cursor.end_idx,
            ctx.config.batch_size,
        )
        .await?;

    if events.is_empty() {
        debug!("no new created events");
        return Ok(None);
    }

    let mut addrs = Vec::with_capacity(events.len());
    let mut names = Vec::with_capacity(events.len());
    let mut tickers = Vec::with_capacity(events.len());
    let mut imgs = Vec::with_capacity(events.len());
    let mut descriptions = Vec::with_capacity(events.len());
    let mut twitters = Vec::with_capacity(events.len());
    let mut telegrams = Vec::with_capacity(events.len());
    let mut websites = Vec::with_capacity(events.len());
    let mut curves = Vec::with_capacity(events.len());
    let mut creators = Vec::with_capacity(events.len());
    let mut aptos_reserves = Vec::with_capacity(events.len());
    let mut token_reserves = Vec::with_capacity(events.len());
    let mut created_ats = Vec::with_capacity(events.len());

    for event in &events {
        let token = &event.data;
        addrs.push(token.token_address.clone());
        names.push(token.name.clone());
        tickers.push(token.symbol.clone());
        imgs.push(token.uri.clone());
        descriptions.push(token.description.clone());
        twitters.push(token.twitter.clone());
        telegrams.push(token.telegram.clone());
        websites.push(token.website.clone());
        curves.push(token.bonding_curve.clone());
        creators.push(token.created_by.clone());
        aptos_reserves.push(token.virtual_aptos_reserves);
        token_reserves.push(token.virtual_token_reserves);
        created_ats.push(token.timestamp());
    }

    let new_users = derive_users(creators.iter().map(String::as_str));
    let user_count = insert_users(&mut tx, &new_users).await?;

    let token_count = sqlx::query(
        "INSERT INTO tokens (\
             addr, name, ticker, img, description, twitter, telegram, website, \
             bonding_curve, created_by, virtual_aptos_reserves, \
             virtual_token_reserves, initial_token_reserves, created_at\
         ) \
         SELECT * FROM UNNEST(\
             $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], \
             $6::text[], $7::text[], $8::text[], $9::text[], $10::text[], \
             $11::numeric[], $12::numeric[], $13::numeric[], $14::timestamptz[]\
         ) \
         ON CONFLICT (addr) DO NOTHING",
    )
    .bind(&addrs)
    .bind(&names)
    .bind(&tickers)
    .bind(&imgs)
    .bind(&descriptions)
    .bind(&twitters)
    .bind(&telegrams)
    .bind(&websites)
    .bind(&curves)
    .bind(&creators)
    .bind(&aptos_reserves)
    .bind(&token_reserves)
    .bind(&token_reserves)
    .bind(&created_ats)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // The module address starts as the sole holder of the full reserve.
    sqlx::query(
        "INSERT INTO holders (token_addr, holder_addr, amount) \
         SELECT $1::text, t.token_addr, t.amount \
         FROM UNNEST($2::text[], $3::numeric[]) AS t(token_addr, amount) \
         ON CONFLICT (token_addr, holder_addr) DO NOTHING",
    )
    .bind(&ctx.config.module_addr)
    .bind(&addrs)
    .bind(&token_reserves)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE counting_metadata \
         SET user_c = user_c + $1, token_c = token_c + $2 \
         WHERE id = 1",
    )
    .bind(i64::try_from(user_count).unwrap_or(0))
    .bind(i64::try_from(token_count).unwrap_or(0))
    .execute(&mut *tx)
    .await?;

    cursor::advance_cursor(&mut tx, &cursor, events.len()).await?;

    tx.commit().await?;

    let summary = BatchSummary {
        category: EventCategory::Created,
        from: cursor.end_idx,
        to: cursor.next_end(events.len()),
        events: events.len(),
    };

    info!(
        from = summary.from,
        to = summary.to,
        tokens = token_count,
        users = user_count,
        "created batch committed"
    );

    Ok(Some(summary))
}
