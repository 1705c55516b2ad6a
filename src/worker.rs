//! The ingestion poll loop.
//!
//! Each cycle runs the three category handlers concurrently, each wrapped
//! in a fixed time budget, and classifies every outcome before sleeping
//! and going again. A handler's failure is contained to its own category
//! and cycle; only configuration defects abort the loop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::ingest::{self, BatchSummary, EventCategory};

/// Outcome of one handler invocation within a cycle.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// The batch and its cursor advance were committed.
    Committed(BatchSummary),

    /// No new events existed this cycle.
    Idle,

    /// A retryable dependency miss rolled the batch back; the next cycle
    /// retries it.
    Skipped(WorkerError),

    /// The handler exceeded its time budget. Its in-flight transaction is
    /// abandoned to the pool's rollback-on-drop behavior.
    TimedOut,

    /// The handler failed unexpectedly.
    Failed(WorkerError),
}

impl HandlerOutcome {
    /// Classifies a finished handler result.
    #[must_use]
    pub fn classify(result: Result<Option<BatchSummary>, WorkerError>) -> Self {
        match result {
            Ok(Some(batch)) => Self::Committed(batch),
            Ok(None) => Self::Idle,
            Err(e) if e.is_ignorable() => Self::Skipped(e),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Races a handler against its time budget and classifies the outcome.
async fn run_with_timeout<F>(budget: Duration, handler: F) -> HandlerOutcome
where
    F: Future<Output = Result<Option<BatchSummary>, WorkerError>>,
{
    match tokio::time::timeout(budget, handler).await {
        Ok(result) => HandlerOutcome::classify(result),
        Err(_) => HandlerOutcome::TimedOut,
    }
}

/// The ingestion worker driving the three category handlers.
pub struct Worker {
    /// Shared handles.
    ctx: Arc<WorkerContext>,

    /// Whether the poll loop keeps running.
    running: Arc<AtomicBool>,
}

impl Worker {
    /// Creates a new worker over the given context.
    #[must_use]
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self {
            ctx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if the poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops the poll loop after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("worker stop requested");
    }

    /// Runs the poll loop until stopped.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`WorkerError`] (a configuration defect such
    /// as a missing cursor row); everything else is logged and the loop
    /// continues.
    pub async fn run(&self) -> Result<(), WorkerError> {
        self.running.store(true, Ordering::Relaxed);

        let poll_interval = Duration::from_millis(self.ctx.config.poll_interval_ms);
        info!("ingestion loop started");

        while self.is_running() {
            self.cycle_once().await?;
            tokio::time::sleep(poll_interval).await;
        }

        info!("ingestion loop stopped");
        Ok(())
    }

    /// Runs a single ingestion cycle: all three handlers concurrently,
    /// each under the configured time budget.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`WorkerError`] among the outcomes.
    pub async fn cycle_once(&self) -> Result<(), WorkerError> {
        let budget = Duration::from_millis(self.ctx.config.handler_timeout_ms);

        let (created, traded, completed) = tokio::join!(
            run_with_timeout(budget, ingest::handle_created(&self.ctx)),
            run_with_timeout(budget, ingest::handle_traded(&self.ctx)),
            run_with_timeout(budget, ingest::handle_completed(&self.ctx)),
        );

        self.ctx.metrics.record_cycle();

        self.report(EventCategory::Created, created)?;
        self.report(EventCategory::Traded, traded)?;
        self.report(EventCategory::Completed, completed)?;

        Ok(())
    }

    /// Logs and counts one handler outcome, surfacing only fatal errors.
    fn report(
        &self,
        category: EventCategory,
        outcome: HandlerOutcome,
    ) -> Result<(), WorkerError> {
        match outcome {
            HandlerOutcome::Committed(batch) => {
                self.ctx.metrics.record_batch(batch.events as u64);
            }
            HandlerOutcome::Idle => {}
            HandlerOutcome::Skipped(e) => {
                self.ctx.metrics.record_skipped();
                debug!(%category, reason = %e, "batch skipped; will retry");
            }
            HandlerOutcome::TimedOut => {
                self.ctx.metrics.record_timeout();
                warn!(%category, "handler timed out");
            }
            HandlerOutcome::Failed(e) if e.is_fatal() => {
                error!(%category, error = %e, "fatal worker error");
                return Err(e);
            }
            HandlerOutcome::Failed(e) => {
                self.ctx.metrics.record_error();
                error!(%category, error = %e, "handler failed");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn summary() -> BatchSummary {
        BatchSummary {
            category: EventCategory::Created,
            from: 0,
            to: 3,
            events: 3,
        }
    }

    #[test]
    fn test_classify_committed() {
        let outcome = HandlerOutcome::classify(Ok(Some(summary())));
        assert!(matches!(outcome, HandlerOutcome::Committed(_)));
    }

    #[test]
    fn test_classify_idle() {
        let outcome = HandlerOutcome::classify(Ok(None));
        assert!(matches!(outcome, HandlerOutcome::Idle));
    }

    #[test]
    fn test_classify_ignorable_as_skipped() {
        let err = WorkerError::TokenMissing {
            address: "0xabc".to_string(),
            category: EventCategory::Traded,
        };
        let outcome = HandlerOutcome::classify(Err(err));
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    #[test]
    fn test_classify_fatal_as_failed() {
        let err = WorkerError::CursorMissing {
            category: EventCategory::Created,
        };
        let outcome = HandlerOutcome::classify(Err(err));
        assert!(matches!(outcome, HandlerOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_run_with_timeout_passes_through() {
        let outcome =
            run_with_timeout(Duration::from_secs(1), async { Ok(Some(summary())) }).await;
        assert!(matches!(outcome, HandlerOutcome::Committed(_)));
    }

    #[tokio::test]
    async fn test_run_with_timeout_expires() {
        let outcome = run_with_timeout(Duration::from_millis(5), async {
            std::future::pending::<Result<Option<BatchSummary>, WorkerError>>().await
        })
        .await;
        assert!(matches!(outcome, HandlerOutcome::TimedOut));
    }
}
