//! Background holder-balance reconciliation.
//!
//! Incremental trade tracking drifts whenever transfers happen outside the
//! launchpad (direct coin transfers, airdrops). Reconciliation re-derives a
//! token's complete holder set from the chain indexer's authoritative
//! balance index and replaces the locally tracked set wholesale.
//!
//! A low-frequency scheduler enqueues a job per uncompleted token into
//! `worker_holders`; a worker loop drains a couple of jobs at a time,
//! each in its own transaction with an isolated failure domain. A job only
//! commits once the balance index has been paginated to the end — partial
//! snapshots are never applied — and the module address (the curve's own
//! holding) is never reconciled away.

pub mod retry;

pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::ledger::CoinBalance;

/// Page size against the balance index.
const PAGE_SIZE: i64 = 100;

/// Jobs drained per worker tick.
const JOBS_PER_TICK: i64 = 2;

/// Sleep when the queue is empty.
const IDLE_WAIT: Duration = Duration::from_secs(5);

/// Interval between scheduler sweeps.
const SCHEDULE_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

/// Runs the job scheduler: seeds the queue at startup and re-sweeps every
/// two hours. Never returns.
pub async fn run_scheduler(ctx: Arc<WorkerContext>) {
    let mut ticker = tokio::time::interval(SCHEDULE_INTERVAL);

    loop {
        ticker.tick().await;

        match enqueue_jobs(&ctx).await {
            Ok(enqueued) => info!(enqueued, "holder jobs scheduled"),
            Err(e) => error!(error = %e, "holder job scheduling failed"),
        }
    }
}

/// Enqueues a reconciliation job for every token that has not completed
/// its pool. Tokens already queued are left untouched.
///
/// # Errors
///
/// Returns [`WorkerError::Database`] on query failure.
pub async fn enqueue_jobs(ctx: &WorkerContext) -> Result<u64, WorkerError> {
    let result = sqlx::query(
        "INSERT INTO worker_holders (token_addr) \
         SELECT addr FROM tokens WHERE completed_at IS NULL \
         ON CONFLICT (token_addr) DO NOTHING",
    )
    .execute(&ctx.db)
    .await?;

    Ok(result.rows_affected())
}

/// Runs the reconciliation worker loop. Never returns.
///
/// Each tick drains up to [`JOBS_PER_TICK`] of the oldest queued jobs and
/// runs them concurrently. One job's failure leaves its queue row in place
/// and does not affect its siblings.
pub async fn run_worker(ctx: Arc<WorkerContext>) {
    loop {
        let jobs = match claim_jobs(&ctx).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "holder job lookup failed");
                tokio::time::sleep(IDLE_WAIT).await;
                continue;
            }
        };

        if jobs.is_empty() {
            debug!("no holder jobs queued");
            tokio::time::sleep(IDLE_WAIT).await;
            continue;
        }

        let runs = jobs.iter().map(|token| sync_token_holders(&ctx, token));
        for (token, outcome) in jobs.iter().zip(join_all(runs).await) {
            match outcome {
                Ok(()) => ctx.metrics.record_reconciliation(),
                Err(e) => {
                    ctx.metrics.record_reconciliation_failure();
                    warn!(
                        token = %token,
                        error = %e,
                        "holder reconciliation failed; job left queued"
                    );
                }
            }
        }
    }
}

/// Selects the oldest queued jobs whose token has not completed.
async fn claim_jobs(ctx: &WorkerContext) -> Result<Vec<String>, WorkerError> {
    let jobs = sqlx::query_scalar::<_, String>(
        "SELECT wh.token_addr FROM worker_holders wh \
         JOIN tokens t ON t.addr = wh.token_addr \
         WHERE t.completed_at IS NULL \
         ORDER BY wh.created_at ASC \
         LIMIT $1",
    )
    .bind(JOBS_PER_TICK)
    .fetch_all(&ctx.db)
    .await?;

    Ok(jobs)
}

/// Reconciles one token's holder set against the balance index.
///
/// Fetches the complete current holder snapshot, then in one transaction:
/// zeroes every tracked holder absent from the snapshot (the module
/// address is exempt), upserts every fetched balance, and removes the job
/// row.
///
/// # Errors
///
/// Returns a [`WorkerError`] if pagination exhausts its retries or a
/// database statement fails; the job row stays queued in that case.
pub async fn sync_token_holders(
    ctx: &WorkerContext,
    token_addr: &str,
) -> Result<(), WorkerError> {
    info!(token = %token_addr, "holder reconciliation starting");

    let balances = fetch_full_snapshot(ctx, token_addr).await?;

    let mut tx = ctx.db.begin().await?;

    let mut keep: Vec<String> = Vec::with_capacity(balances.len() + 1);
    keep.push(ctx.config.module_addr.clone());
    keep.extend(balances.iter().map(|b| b.owner_address.clone()));

    sqlx::query(
        "UPDATE holders SET amount = 0 \
         WHERE token_addr = $1 AND holder_addr <> ALL($2)",
    )
    .bind(token_addr)
    .bind(&keep)
    .execute(&mut *tx)
    .await?;

    if !balances.is_empty() {
        let owners: Vec<String> = balances.iter().map(|b| b.owner_address.clone()).collect();
        let amounts: Vec<rust_decimal::Decimal> = balances.iter().map(|b| b.amount).collect();

        sqlx::query(
            "INSERT INTO holders (token_addr, holder_addr, amount) \
             SELECT $1::text, t.holder_addr, t.amount \
             FROM UNNEST($2::text[], $3::numeric[]) AS t(holder_addr, amount) \
             ON CONFLICT (token_addr, holder_addr) \
             DO UPDATE SET amount = EXCLUDED.amount",
        )
        .bind(token_addr)
        .bind(&owners)
        .bind(&amounts)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM worker_holders WHERE token_addr = $1")
        .bind(token_addr)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        token = %token_addr,
        holders = balances.len(),
        "holder reconciliation completed"
    );

    Ok(())
}

/// Paginates the balance index until an empty page, accumulating the full
/// snapshot in memory.
async fn fetch_full_snapshot(
    ctx: &WorkerContext,
    token_addr: &str,
) -> Result<Vec<CoinBalance>, WorkerError> {
    let policy = RetryPolicy::default();
    let mut balances = Vec::new();
    let mut offset = 0_i64;

    loop {
        let page = fetch_page(ctx, token_addr, offset, &policy).await?;
        if page.is_empty() {
            break;
        }

        offset += page.len() as i64;
        balances.extend(page);
    }

    Ok(balances)
}

/// Fetches one balance page, retrying transient failures with bounded
/// backoff.
async fn fetch_page(
    ctx: &WorkerContext,
    token_addr: &str,
    offset: i64,
    policy: &RetryPolicy,
) -> Result<Vec<CoinBalance>, WorkerError> {
    let mut attempt = 0_u32;

    loop {
        match ctx.ledger.fetch_balances(token_addr, offset, PAGE_SIZE).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt + 1 < policy.max_attempts => {
                attempt += 1;
                let backoff = policy.delay(attempt);
                warn!(
                    token = %token_addr,
                    offset,
                    attempt,
                    error = %e,
                    "balance page fetch failed; backing off"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
