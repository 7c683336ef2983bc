//! Application service layer: balance history orchestration.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::{
    AppError, BalanceHistory, BalanceHistoryQuery, CurrentBalanceResponse, DatabaseClient,
    EventStoreReader, HealthResponse, HealthStatus, HoldingsReader, ReconciliationReport,
    ValidationError, net_balance, replay_as_of,
};

use super::oracle::CurrentBalanceOracle;

/// Application service containing business logic
pub struct AppService {
    db_client: Arc<dyn DatabaseClient>,
    event_store: Arc<dyn EventStoreReader>,
    oracle: CurrentBalanceOracle,
}

impl AppService {
    #[must_use]
    pub fn new(
        db_client: Arc<dyn DatabaseClient>,
        event_store: Arc<dyn EventStoreReader>,
        holdings: Arc<dyn HoldingsReader>,
    ) -> Self {
        Self {
            db_client,
            event_store,
            oracle: CurrentBalanceOracle::new(holdings),
        }
    }

    /// Reconstruct the bucketed balance history for a subject.
    ///
    /// The event fetch and the holdings read run concurrently; either failure
    /// aborts the whole query.
    #[instrument(skip(self, query), fields(subject_id = %query.subject_id, granularity = %query.granularity))]
    pub async fn get_balance_history(
        &self,
        query: &BalanceHistoryQuery,
    ) -> Result<BalanceHistory, AppError> {
        query.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;
        query.check_range().map_err(|e| {
            warn!(error = %e, "Rejected inverted range");
            AppError::Validation(e)
        })?;

        let now = Utc::now();
        let range_end = query.range_end.unwrap_or(now);
        if let Some(start) = query.range_start {
            query
                .check_point_budget(start, range_end)
                .map_err(reject_oversized)?;
        }

        let (events, current_balance) = tokio::try_join!(
            self.event_store
                .fetch_events(&query.subject_id, query.range_start, query.range_end),
            self.oracle.current_balance(&query.subject_id),
        )?;

        let Some(first) = events.first() else {
            info!("No ledger events in range");
            return Ok(BalanceHistory::new(
                query.subject_id.clone(),
                query.range_start,
                range_end,
                query.granularity,
                Vec::new(),
                current_balance,
            ));
        };

        let range_start = match query.range_start {
            Some(start) => start,
            None => {
                query
                    .check_point_budget(first.timestamp, range_end)
                    .map_err(reject_oversized)?;
                first.timestamp
            }
        };

        let history = replay_as_of(
            &events,
            query.granularity,
            query.range_start,
            query.range_end,
            now,
        );

        info!(
            events = events.len(),
            points = history.len(),
            "Balance history reconstructed"
        );

        Ok(BalanceHistory::new(
            query.subject_id.clone(),
            Some(range_start),
            range_end,
            query.granularity,
            history,
            current_balance,
        ))
    }

    /// Live balance from the holdings view
    #[instrument(skip(self))]
    pub async fn get_current_balance(
        &self,
        subject_id: &str,
    ) -> Result<CurrentBalanceResponse, AppError> {
        let subject_id = validate_subject_id(subject_id)?;
        let (holdings, current_balance) = self.oracle.holdings_with_total(&subject_id).await?;
        Ok(CurrentBalanceResponse {
            subject_id,
            current_balance,
            holding_count: holdings.len(),
        })
    }

    /// Compare an unbounded ledger replay against the holdings view.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, subject_id: &str) -> Result<ReconciliationReport, AppError> {
        let subject_id = validate_subject_id(subject_id)?;
        let (events, current_balance) = tokio::try_join!(
            self.event_store.fetch_events(&subject_id, None, None),
            self.oracle.current_balance(&subject_id),
        )?;

        let report = ReconciliationReport::new(
            subject_id,
            net_balance(&events),
            current_balance,
            events.len(),
        );

        if report.consistent {
            info!(subject_id = %report.subject_id, "Ledger and holdings agree");
        } else {
            warn!(
                subject_id = %report.subject_id,
                replayed = %report.replayed_balance,
                current = %report.current_balance,
                discrepancy = %report.discrepancy,
                "Ledger replay disagrees with holdings"
            );
        }

        Ok(report)
    }

    /// Perform health check on all dependencies
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let db_health = match self.db_client.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                HealthStatus::Unhealthy
            }
        };
        HealthResponse::new(db_health)
    }
}

fn reject_oversized(err: ValidationError) -> AppError {
    warn!(error = %err, "Rejected oversized range");
    AppError::Validation(err)
}

/// Subject ids are 1-128 characters once trimmed
fn validate_subject_id(subject_id: &str) -> Result<String, AppError> {
    let trimmed = subject_id.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 128 {
        return Err(AppError::Validation(ValidationError::InvalidField {
            field: "subject_id".to_string(),
            message: "Subject id must be 1-128 characters".to_string(),
        }));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, Holding, LedgerEvent};
    use crate::test_utils::MockLedgerStore;
    use chrono::{DateTime, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn service_for(store: &Arc<MockLedgerStore>) -> AppService {
        AppService::new(
            Arc::clone(store) as _,
            Arc::clone(store) as _,
            Arc::clone(store) as _,
        )
    }

    fn seeded_store() -> Arc<MockLedgerStore> {
        let store = Arc::new(MockLedgerStore::new());
        store.add_event(LedgerEvent::mint("user-1", dec!(100), day(1)));
        store.add_event(LedgerEvent::mint("user-1", dec!(50), day(2)));
        store.add_event(LedgerEvent::burn("user-1", dec!(25), day(3)));
        store.add_holding(Holding::new("user-1", dec!(125)));
        store
    }

    #[tokio::test]
    async fn test_balance_history_scenario() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(Some(day(1)), Some(day(3)));
        let history = service.get_balance_history(&query).await.unwrap();

        assert_eq!(history.range_start, Some(day(1)));
        assert_eq!(history.range_end, day(3));
        assert_eq!(history.point_count, 3);
        assert_eq!(history.point_count, history.history.len());
        assert_eq!(history.history[2].balance, dec!(125));
        assert_eq!(history.current_balance, dec!(125));
    }

    #[tokio::test]
    async fn test_range_start_defaults_to_first_event() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(None, Some(day(4)));
        let history = service.get_balance_history(&query).await.unwrap();

        assert_eq!(history.range_start, Some(day(1)));
        assert_eq!(history.point_count, 4);
    }

    #[tokio::test]
    async fn test_empty_history_still_reports_current_balance() {
        let store = Arc::new(MockLedgerStore::new());
        store.add_holding(Holding::new("user-9", dec!(42)));
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-9", Granularity::Weekly);
        let history = service.get_balance_history(&query).await.unwrap();

        assert!(history.history.is_empty());
        assert_eq!(history.point_count, 0);
        assert!(history.range_start.is_none());
        assert_eq!(history.current_balance, dec!(42));
    }

    #[tokio::test]
    async fn test_events_outside_range_are_not_replayed() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(Some(day(2)), Some(day(3)));
        let history = service.get_balance_history(&query).await.unwrap();

        let balances: Vec<Decimal> = history.history.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![dec!(50), dec!(25)]);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected_before_fetch() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(Some(day(3)), Some(day(1)));
        let err = service.get_balance_history(&query).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidRange { .. })
        ));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_range_is_rejected_before_fetch() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily).with_range(
            Some(Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap()),
        );
        let err = service.get_balance_history(&query).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::TooManyPoints { .. })
        ));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_open_start_is_budgeted_from_first_event() {
        let store = Arc::new(MockLedgerStore::new());
        store.add_event(LedgerEvent::mint(
            "user-1",
            dec!(1),
            Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap(),
        ));
        let service = service_for(&store);

        let daily = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(None, Some(day(1)));
        assert!(matches!(
            service.get_balance_history(&daily).await,
            Err(AppError::Validation(ValidationError::TooManyPoints { .. }))
        ));

        let monthly = BalanceHistoryQuery::new("user-1", Granularity::Monthly)
            .with_range(None, Some(day(1)));
        let history = service.get_balance_history(&monthly).await.unwrap();
        assert_eq!(history.point_count, 124 * 12 + 1);
    }

    #[tokio::test]
    async fn test_empty_window_echoes_requested_start() {
        let store = seeded_store();
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily)
            .with_range(Some(day(10)), Some(day(20)));
        let history = service.get_balance_history(&query).await.unwrap();

        assert_eq!(history.range_start, Some(day(10)));
        assert_eq!(history.range_end, day(20));
        assert_eq!(history.point_count, 0);
        assert_eq!(history.current_balance, dec!(125));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_unchanged() {
        let store = Arc::new(MockLedgerStore::unavailable("connection refused"));
        let service = service_for(&store);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily);
        let err = service.get_balance_history(&query).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Database(crate::domain::DatabaseError::Connection(msg)) if msg == "connection refused"
        ));
    }

    #[tokio::test]
    async fn test_reconcile_detects_discrepancy() {
        let store = seeded_store();
        store.add_holding(Holding::new("user-1", dec!(5)));
        let service = service_for(&store);

        let report = service.reconcile("user-1").await.unwrap();
        assert_eq!(report.replayed_balance, dec!(125));
        assert_eq!(report.current_balance, dec!(130));
        assert_eq!(report.discrepancy, dec!(5));
        assert!(!report.consistent);
        assert_eq!(report.event_count, 3);
    }

    #[tokio::test]
    async fn test_reconcile_agrees_with_full_replay() {
        let store = seeded_store();
        let service = service_for(&store);

        let report = service.reconcile("user-1").await.unwrap();
        assert!(report.consistent);

        let query = BalanceHistoryQuery::new("user-1", Granularity::Daily);
        let history = service.get_balance_history(&query).await.unwrap();
        assert_eq!(history.history.last().unwrap().balance, report.replayed_balance);
    }

    #[tokio::test]
    async fn test_current_balance_rejects_blank_subject() {
        let store = Arc::new(MockLedgerStore::new());
        let service = service_for(&store);
        assert!(matches!(
            service.get_current_balance("  ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check_reports_unhealthy_store() {
        let store = Arc::new(MockLedgerStore::new());
        let service = service_for(&store);
        assert_eq!(service.health_check().await.status, HealthStatus::Healthy);

        store.set_healthy(false);
        assert_eq!(service.health_check().await.status, HealthStatus::Unhealthy);
    }
}
