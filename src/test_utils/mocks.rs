//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    AppError, DatabaseClient, DatabaseError, EventStoreReader, Holding, HoldingsReader,
    LedgerEvent,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    /// Fail as an unreachable store rather than a failed query
    pub unavailable: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            unavailable: false,
            error_message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            unavailable: true,
            error_message: Some(message.into()),
        }
    }
}

/// In-memory ledger and holdings store
pub struct MockLedgerStore {
    events: Arc<Mutex<Vec<LedgerEvent>>>,
    holdings: Arc<Mutex<Vec<Holding>>>,
    config: MockConfig,
    is_healthy: AtomicBool,
    fetch_count: AtomicUsize,
}

impl MockLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            holdings: Arc::new(Mutex::new(Vec::new())),
            config,
            is_healthy: AtomicBool::new(true),
            fetch_count: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::unavailable(message))
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn add_event(&self, event: LedgerEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn add_holding(&self, holding: Holding) {
        self.holdings.lock().unwrap().push(holding);
    }

    /// Number of `fetch_events` calls served (for testing)
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            let err = if self.config.unavailable {
                DatabaseError::Connection(msg)
            } else {
                DatabaseError::Query(msg)
            };
            return Err(AppError::Database(err));
        }
        Ok(())
    }
}

impl Default for MockLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockLedgerStore {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        self.check_should_fail()
    }

    async fn run_migrations(&self) -> Result<(), AppError> {
        self.check_should_fail()
    }
}

#[async_trait]
impl EventStoreReader for MockLedgerStore {
    async fn fetch_events(
        &self,
        subject_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEvent>, AppError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail()?;
        let events = self.events.lock().unwrap();
        let mut matching: Vec<LedgerEvent> = events
            .iter()
            .filter(|e| {
                e.subject_id == subject_id
                    && from.is_none_or(|f| e.timestamp >= f)
                    && to.is_none_or(|t| e.timestamp <= t)
            })
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }
}

#[async_trait]
impl HoldingsReader for MockLedgerStore {
    async fn fetch_current_holdings(&self, subject_id: &str) -> Result<Vec<Holding>, AppError> {
        self.check_should_fail()?;
        let holdings = self.holdings.lock().unwrap();
        Ok(holdings
            .iter()
            .filter(|h| h.subject_id == subject_id)
            .cloned()
            .collect())
    }
}
