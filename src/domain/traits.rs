//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::AppError;
use super::types::{Holding, LedgerEvent};

/// Read access to the append-only LP token ledger
#[async_trait]
pub trait EventStoreReader: Send + Sync {
    /// Fetch every event for `subject_id` with `from <= timestamp <= to`.
    ///
    /// Implementations must return events sorted ascending by timestamp;
    /// the replayer relies on it and does not re-sort.
    async fn fetch_events(
        &self,
        subject_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEvent>, AppError>;
}

/// Read access to the materialized holdings view
#[async_trait]
pub trait HoldingsReader: Send + Sync {
    /// Fetch the positions `subject_id` currently holds
    async fn fetch_current_holdings(&self, subject_id: &str) -> Result<Vec<Holding>, AppError>;
}

/// Connectivity probe for the backing store
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Check database connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Apply pending schema migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        Err(AppError::NotSupported(
            "run_migrations not implemented".to_string(),
        ))
    }
}
