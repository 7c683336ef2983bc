//! PostgreSQL implementation of the ledger collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::domain::{
    AppError, DatabaseClient, DatabaseError, EventKind, EventStoreReader, Holding, HoldingsReader,
    LedgerEvent,
};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// PostgreSQL database client with connection pooling
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client with custom configuration
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, AppError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client with default configuration
    pub async fn with_defaults(database_url: &str) -> Result<Self, AppError> {
        Self::new(database_url, PostgresConfig::default()).await
    }

    /// Get the underlying connection pool (for testing)
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<LedgerEvent, AppError> {
        let kind: String = row.try_get("kind")?;
        let kind = kind
            .parse::<EventKind>()
            .map_err(|e| AppError::Database(DatabaseError::Decode(e)))?;

        Ok(LedgerEvent {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            amount: row.try_get("amount")?,
            kind,
            timestamp: row.try_get("created_at")?,
            reference: row.try_get("reference")?,
        })
    }

    fn row_to_holding(row: &sqlx::postgres::PgRow) -> Result<Holding, AppError> {
        Ok(Holding {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            amount: row.try_get("amount")?,
            acquired_at: row.try_get("acquired_at")?,
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }

    /// Run database migrations using sqlx migrate
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Migration(e.to_string())))?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl EventStoreReader for PostgresClient {
    #[instrument(skip(self))]
    async fn fetch_events(
        &self,
        subject_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEvent>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, amount, kind, reference, created_at
            FROM lp_token_events
            WHERE subject_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(subject_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Fetched ledger events");
        rows.iter().map(Self::row_to_event).collect()
    }
}

#[async_trait]
impl HoldingsReader for PostgresClient {
    #[instrument(skip(self))]
    async fn fetch_current_holdings(&self, subject_id: &str) -> Result<Vec<Holding>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, subject_id, amount, acquired_at
            FROM lp_token_holdings
            WHERE subject_id = $1
            ORDER BY acquired_at ASC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_holding).collect()
    }
}
