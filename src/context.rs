//! Shared worker context.
//!
//! All components receive their dependencies through one explicitly
//! constructed [`WorkerContext`] instead of process-wide globals: the
//! configuration, the pooled database handle, the ledger client, and the
//! metrics sink.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::IndexerConfig;
use crate::error::WorkerError;
use crate::ledger::LedgerClient;
use crate::metrics::WorkerMetrics;

/// Shared handles passed to every component at startup.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Loaded configuration.
    pub config: IndexerConfig,

    /// Pooled database connections.
    pub db: PgPool,

    /// Ledger indexer client.
    pub ledger: LedgerClient,

    /// Worker metrics.
    pub metrics: Arc<WorkerMetrics>,
}

impl WorkerContext {
    /// Connects the database pool, applies pending schema migrations, and
    /// builds the ledger client.
    ///
    /// Migrations must succeed before any handler runs; a failure here is
    /// fatal for the process.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if the pool cannot connect, a migration
    /// fails, or the ledger client cannot be built.
    pub async fn initialize(config: IndexerConfig) -> Result<Self, WorkerError> {
        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(25))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!().run(&db).await?;

        let ledger = LedgerClient::new(&config.indexer_url)?;

        Ok(Self {
            config,
            db,
            ledger,
            metrics: Arc::new(WorkerMetrics::new()),
        })
    }

    /// Releases the pooled database connections.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}
