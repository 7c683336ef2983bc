//! Application state management.

use std::sync::Arc;

use crate::domain::{DatabaseClient, EventStoreReader, HoldingsReader};

use super::service::AppService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
}

impl AppState {
    /// Wire the ledger service over its three collaborators
    #[must_use]
    pub fn new(
        db_client: Arc<dyn DatabaseClient>,
        event_store: Arc<dyn EventStoreReader>,
        holdings: Arc<dyn HoldingsReader>,
    ) -> Self {
        Self {
            service: Arc::new(AppService::new(db_client, event_store, holdings)),
        }
    }
}
