//! Integration tests for the API.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
};
use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use lp_token_ledger::api::{RateLimitConfig, create_router, create_router_with_rate_limit};
use lp_token_ledger::app::AppState;
use lp_token_ledger::domain::{
    BalanceHistory, CurrentBalanceResponse, ErrorResponse, Granularity, HealthResponse,
    HealthStatus, Holding, LedgerEvent, ReconciliationReport,
};
use lp_token_ledger::test_utils::MockLedgerStore;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

fn state_for(store: &Arc<MockLedgerStore>) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::clone(store) as _,
        Arc::clone(store) as _,
        Arc::clone(store) as _,
    ))
}

fn seeded_store() -> Arc<MockLedgerStore> {
    let store = Arc::new(MockLedgerStore::new());
    store.add_event(LedgerEvent::mint("user-1", dec!(100), day(1)).with_reference("tx-1"));
    store.add_event(LedgerEvent::mint("user-1", dec!(50), day(2)).with_reference("tx-2"));
    store.add_event(LedgerEvent::burn("user-1", dec!(25), day(3)).with_reference("tx-3"));
    store.add_holding(Holding::new("user-1", dec!(125)));
    store
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn test_daily_balance_history_scenario() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=2024-01-01T00:00:00Z&endDate=2024-01-03T00:00:00Z&interval=daily",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["subjectId"], "user-1");
    assert_eq!(json["granularity"], "daily");
    assert_eq!(json["pointCount"], 3);
    assert_eq!(json["currentBalance"], "125.00000000");

    let balances: Vec<&str> = json["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["balance"].as_str().unwrap())
        .collect();
    assert_eq!(balances, vec!["100.00000000", "150.00000000", "125.00000000"]);
}

#[tokio::test]
async fn test_interval_defaults_to_daily() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=2024-01-01&endDate=2024-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history: BalanceHistory = serde_json::from_slice(&body).unwrap();
    assert_eq!(history.granularity, Granularity::Daily);
    assert_eq!(history.point_count, 2);
}

#[tokio::test]
async fn test_weekly_history_points_are_mondays() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=2024-01-03&endDate=2024-01-17&interval=weekly",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history: BalanceHistory = serde_json::from_slice(&body).unwrap();
    assert!(history.point_count >= 2);
    assert!(
        history
            .history
            .iter()
            .all(|p| p.timestamp.weekday() == Weekday::Mon)
    );
}

#[tokio::test]
async fn test_monthly_history_over_first_quarter() {
    let store = Arc::new(MockLedgerStore::new());
    store.add_event(LedgerEvent::mint("user-2", dec!(10), day(1)));
    store.add_event(LedgerEvent::mint(
        "user-2",
        dec!(5),
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    ));
    let router = create_router(state_for(&store));

    let (status, body) = get(
        router,
        "/lp-tokens/user-2/balance-history?startDate=2024-01-01&endDate=2024-03-31&interval=monthly",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history: BalanceHistory = serde_json::from_slice(&body).unwrap();
    assert_eq!(history.point_count, 3);
    let days: Vec<u32> = history.history.iter().map(|p| p.timestamp.day()).collect();
    assert_eq!(days, vec![1, 1, 1]);
    assert_eq!(history.history[2].balance, dec!(15));
}

#[tokio::test]
async fn test_empty_history_reports_na_start_and_live_balance() {
    let store = Arc::new(MockLedgerStore::new());
    store.add_holding(Holding::new("user-3", dec!(7.5)));
    let router = create_router(state_for(&store));

    let (status, body) = get(router, "/lp-tokens/user-3/balance-history").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["rangeStart"], "N/A");
    assert_eq!(json["pointCount"], 0);
    assert_eq!(json["history"].as_array().unwrap().len(), 0);
    assert_eq!(json["currentBalance"], "7.50000000");
}

#[tokio::test]
async fn test_unknown_interval_is_bad_request() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(router, "/lp-tokens/user-1/balance-history?interval=hourly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error.r#type, "validation_error");
    assert!(err.error.message.contains("hourly"));
}

#[tokio::test]
async fn test_inverted_range_is_bad_request() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=2024-01-03&endDate=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(err.error.message.contains("Invalid range"));
}

#[tokio::test]
async fn test_malformed_date_is_bad_request() {
    let router = create_router(state_for(&seeded_store()));

    let (status, _) = get(router, "/lp-tokens/user-1/balance-history?endDate=not-a-date").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_daily_range_is_bad_request() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=0001-01-01&endDate=9999-12-31",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error.r#type, "validation_error");
    assert!(err.error.message.contains("coarser interval"));
}

#[tokio::test]
async fn test_undeserializable_query_is_json_bad_request() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?interval=daily&interval=weekly",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error.r#type, "validation_error");
    assert!(err.error.message.contains("interval"));
}

#[tokio::test]
async fn test_empty_window_echoes_range_start() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(
        router,
        "/lp-tokens/user-1/balance-history?startDate=2024-02-01T00:00:00Z&endDate=2024-02-10T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history: BalanceHistory = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        history.range_start,
        Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(history.point_count, 0);
    assert!(history.history.is_empty());
    assert_eq!(history.current_balance, dec!(125));
}

#[tokio::test]
async fn test_store_unavailable_is_service_unavailable() {
    let store = Arc::new(MockLedgerStore::unavailable("connection refused"));
    let router = create_router(state_for(&store));

    let (status, body) = get(router, "/lp-tokens/user-1/balance-history").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(err.error.r#type, "store_unavailable");
}

#[tokio::test]
async fn test_current_balance_endpoint() {
    let store = seeded_store();
    store.add_holding(Holding::new("user-1", dec!(0.00000001)));
    let router = create_router(state_for(&store));

    let (status, body) = get(router, "/lp-tokens/user-1/balance").await;
    assert_eq!(status, StatusCode::OK);

    let balance: CurrentBalanceResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(balance.holding_count, 2);
    assert_eq!(balance.current_balance, dec!(125.00000001));
}

#[tokio::test]
async fn test_reconciliation_endpoint() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(router, "/lp-tokens/user-1/reconciliation").await;
    assert_eq!(status, StatusCode::OK);

    let report: ReconciliationReport = serde_json::from_slice(&body).unwrap();
    assert!(report.consistent);
    assert_eq!(report.event_count, 3);
    assert_eq!(report.replayed_balance, dec!(125));
}

#[tokio::test]
async fn test_health_endpoints() {
    let store = Arc::new(MockLedgerStore::new());
    let router = create_router(state_for(&store));

    let (status, body) = get(router.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, HealthStatus::Healthy);

    let (status, _) = get(router.clone(), "/health/live").await;
    assert_eq!(status, StatusCode::OK);

    store.set_healthy(false);
    let (status, _) = get(router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_rate_limit_rejects_burst_overflow() {
    let config = RateLimitConfig {
        requests_per_second: 1,
        burst_size: 1,
    };
    let router = create_router_with_rate_limit(state_for(&seeded_store()), config);

    let (first, _) = get(router.clone(), "/lp-tokens/user-1/balance").await;
    assert_eq!(first, StatusCode::OK);

    let (second, body) = get(router.clone(), "/lp-tokens/user-1/balance").await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "rate_limited");
    assert!(json["retry_after"].as_u64().unwrap() >= 1);

    // Health probes sit outside the limiter
    let (health, _) = get(router, "/health/live").await;
    assert_eq!(health, StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let router = create_router(state_for(&seeded_store()));

    let (status, body) = get(router, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"]["/lp-tokens/{subject_id}/balance-history"].is_object());
}
