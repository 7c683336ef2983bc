//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::error;
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    AppError, BalanceHistory, BalanceHistoryParams, BalanceHistoryQuery, BalancePoint,
    CurrentBalanceResponse, DatabaseError, ErrorDetail, ErrorResponse, Granularity,
    HealthResponse, HealthStatus, RateLimitResponse, ReconciliationReport, ValidationError,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LP Token Ledger API",
        version = "0.1.0",
        description = "Balance history reconstruction over the LP token mint/burn ledger",
        license(
            name = "MIT"
        )
    ),
    paths(
        balance_history_handler,
        current_balance_handler,
        reconciliation_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            BalanceHistory,
            BalancePoint,
            BalanceHistoryParams,
            Granularity,
            CurrentBalanceResponse,
            ReconciliationReport,
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
            RateLimitResponse,
        )
    ),
    tags(
        (name = "lp-tokens", description = "LP token balance endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Reconstruct a subject's LP token balance history
///
/// Replays the subject's mint/burn ledger into one balance point per bucket.
/// Each point carries the balance including every event at or before the
/// bucket start. `currentBalance` comes from the live holdings view and is
/// present even when the history is empty.
#[utoipa::path(
    get,
    path = "/lp-tokens/{subject_id}/balance-history",
    tag = "lp-tokens",
    params(
        ("subject_id" = String, Path, description = "Subject (user/account) identifier"),
        ("startDate" = Option<String>, Query, description = "ISO-8601 instant or YYYY-MM-DD; defaults to the first event"),
        ("endDate" = Option<String>, Query, description = "ISO-8601 instant or YYYY-MM-DD; defaults to now"),
        ("interval" = Option<String>, Query, description = "daily (default), weekly or monthly")
    ),
    responses(
        (status = 200, description = "Balance history", body = BalanceHistory),
        (status = 400, description = "Invalid range, date or interval, or too many buckets", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Ledger store unavailable", body = ErrorResponse)
    )
)]
pub async fn balance_history_handler(
    State(state): State<Arc<AppState>>,
    subject_id: Result<Path<String>, PathRejection>,
    params: Result<Query<BalanceHistoryParams>, QueryRejection>,
) -> Result<Json<BalanceHistory>, AppError> {
    let Path(subject_id) = subject_id.map_err(path_rejection)?;
    let Query(params) = params.map_err(query_rejection)?;
    let query = BalanceHistoryQuery::parse(&subject_id, &params)?;
    let history = state.service.get_balance_history(&query).await?;
    Ok(Json(history))
}

/// Current LP token balance from the holdings view
#[utoipa::path(
    get,
    path = "/lp-tokens/{subject_id}/balance",
    tag = "lp-tokens",
    params(
        ("subject_id" = String, Path, description = "Subject (user/account) identifier")
    ),
    responses(
        (status = 200, description = "Current balance", body = CurrentBalanceResponse),
        (status = 400, description = "Invalid subject id", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitResponse),
        (status = 503, description = "Holdings store unavailable", body = ErrorResponse)
    )
)]
pub async fn current_balance_handler(
    State(state): State<Arc<AppState>>,
    subject_id: Result<Path<String>, PathRejection>,
) -> Result<Json<CurrentBalanceResponse>, AppError> {
    let Path(subject_id) = subject_id.map_err(path_rejection)?;
    let balance = state.service.get_current_balance(&subject_id).await?;
    Ok(Json(balance))
}

/// Compare the replayed ledger balance with current holdings
///
/// `consistent` is false when the two sources disagree; `discrepancy` is
/// `currentBalance - replayedBalance`.
#[utoipa::path(
    get,
    path = "/lp-tokens/{subject_id}/reconciliation",
    tag = "lp-tokens",
    params(
        ("subject_id" = String, Path, description = "Subject (user/account) identifier")
    ),
    responses(
        (status = 200, description = "Reconciliation report", body = ReconciliationReport),
        (status = 400, description = "Invalid subject id", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitResponse),
        (status = 503, description = "Ledger store unavailable", body = ErrorResponse)
    )
)]
pub async fn reconciliation_handler(
    State(state): State<Arc<AppState>>,
    subject_id: Result<Path<String>, PathRejection>,
) -> Result<Json<ReconciliationReport>, AppError> {
    let Path(subject_id) = subject_id.map_err(path_rejection)?;
    let report = state.service.reconcile(&subject_id).await?;
    Ok(Json(report))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Application is not ready")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::Validation(ValidationError::InvalidField {
        field: "subject_id".to_string(),
        message: rejection.body_text(),
    })
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::Validation(ValidationError::InvalidField {
        field: "query".to_string(),
        message: rejection.body_text(),
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type, message) = match &self {
            AppError::Database(db_err) => match db_err {
                DatabaseError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    self.to_string(),
                ),
                DatabaseError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found", self.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    self.to_string(),
                ),
            },
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::NotSupported(_) => (
                StatusCode::NOT_IMPLEMENTED,
                "not_supported",
                self.to_string(),
            ),
            AppError::RateLimited { retry_after } => {
                let body = Json(RateLimitResponse {
                    error: ErrorDetail {
                        r#type: "rate_limited".to_string(),
                        message: "Rate limit exceeded".to_string(),
                    },
                    retry_after: *retry_after,
                });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    body,
                )
                    .into_response();
            }
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
