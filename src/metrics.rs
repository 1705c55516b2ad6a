//! Metrics tracking for the worker.
//!
//! Provides atomic counters for monitoring ingestion and reconciliation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the ingestion loop and the holder reconciler.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    /// Number of completed poll cycles.
    cycles: AtomicU64,

    /// Number of committed batches.
    batches_committed: AtomicU64,

    /// Number of events applied across all committed batches.
    events_ingested: AtomicU64,

    /// Number of batches rolled back on a retryable dependency miss.
    batches_skipped: AtomicU64,

    /// Number of handler invocations that exceeded their time budget.
    timeouts: AtomicU64,

    /// Number of unexpected handler failures.
    errors: AtomicU64,

    /// Number of completed holder reconciliations.
    reconciliations: AtomicU64,

    /// Number of failed holder reconciliation jobs.
    reconciliation_failures: AtomicU64,
}

impl WorkerMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed poll cycle.
    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a committed batch of `events` events.
    pub fn record_batch(&self, events: u64) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.events_ingested.fetch_add(events, Ordering::Relaxed);
    }

    /// Records a batch rolled back on a retryable miss.
    pub fn record_skipped(&self) {
        self.batches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a handler timeout.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unexpected handler failure.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed holder reconciliation.
    pub fn record_reconciliation(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed holder reconciliation job.
    pub fn record_reconciliation_failure(&self) {
        self.reconciliation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of completed poll cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Returns the number of committed batches.
    #[must_use]
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of events applied.
    #[must_use]
    pub fn events_ingested(&self) -> u64 {
        self.events_ingested.load(Ordering::Relaxed)
    }

    /// Returns the number of batches rolled back on a retryable miss.
    #[must_use]
    pub fn batches_skipped(&self) -> u64 {
        self.batches_skipped.load(Ordering::Relaxed)
    }

    /// Returns the number of handler timeouts.
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Returns the number of unexpected handler failures.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the number of completed holder reconciliations.
    #[must_use]
    pub fn reconciliations(&self) -> u64 {
        self.reconciliations.load(Ordering::Relaxed)
    }

    /// Returns the number of failed holder reconciliation jobs.
    #[must_use]
    pub fn reconciliation_failures(&self) -> u64 {
        self.reconciliation_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_start_at_zero() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.cycles(), 0);
        assert_eq!(metrics.batches_committed(), 0);
        assert_eq!(metrics.events_ingested(), 0);
        assert_eq!(metrics.reconciliations(), 0);
    }

    #[test]
    fn test_record_batch_accumulates() {
        let metrics = WorkerMetrics::new();
        metrics.record_batch(10);
        metrics.record_batch(5);
        assert_eq!(metrics.batches_committed(), 2);
        assert_eq!(metrics.events_ingested(), 15);
    }

    #[test]
    fn test_record_outcomes() {
        let metrics = WorkerMetrics::new();
        metrics.record_cycle();
        metrics.record_skipped();
        metrics.record_timeout();
        metrics.record_error();
        metrics.record_reconciliation();
        metrics.record_reconciliation_failure();

        assert_eq!(metrics.cycles(), 1);
        assert_eq!(metrics.batches_skipped(), 1);
        assert_eq!(metrics.timeouts(), 1);
        assert_eq!(metrics.errors(), 1);
        assert_eq!(metrics.reconciliations(), 1);
        assert_eq!(metrics.reconciliation_failures(), 1);
    }
}
