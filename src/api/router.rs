//! Router construction, middleware and rate limiting.

use std::env;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::{Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use governor::{
    DefaultDirectRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;
use crate::domain::AppError;

use super::handlers::{
    ApiDoc, balance_history_handler, current_balance_handler, health_check_handler,
    liveness_handler, readiness_handler, reconciliation_handler,
};

/// Default end-to-end request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Global rate limit configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Burst capacity above the sustained rate
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Read `RATE_LIMIT_RPS` and `RATE_LIMIT_BURST`, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let requests_per_second = env::var("RATE_LIMIT_RPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.requests_per_second);
        let burst_size = env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.burst_size);
        Self {
            requests_per_second,
            burst_size,
        }
    }

    fn quota(&self) -> Quota {
        let rps = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(rps);
        Quota::per_second(rps).allow_burst(burst)
    }
}

/// Router tuning knobs
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub rate_limit: Option<RateLimitConfig>,
    pub request_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            rate_limit: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Create the application router without rate limiting
pub fn create_router(app_state: Arc<AppState>) -> Router {
    create_router_with_options(app_state, RouterOptions::default())
}

/// Create the application router with a global rate limit on ledger routes
pub fn create_router_with_rate_limit(app_state: Arc<AppState>, config: RateLimitConfig) -> Router {
    create_router_with_options(
        app_state,
        RouterOptions {
            rate_limit: Some(config),
            ..Default::default()
        },
    )
}

/// Create the application router
pub fn create_router_with_options(app_state: Arc<AppState>, options: RouterOptions) -> Router {
    let mut ledger_routes = Router::new()
        .route(
            "/lp-tokens/{subject_id}/balance-history",
            get(balance_history_handler),
        )
        .route("/lp-tokens/{subject_id}/balance", get(current_balance_handler))
        .route(
            "/lp-tokens/{subject_id}/reconciliation",
            get(reconciliation_handler),
        );

    if let Some(config) = options.rate_limit {
        let limiter = Arc::new(RateLimiter::direct(config.quota()));
        ledger_routes = ledger_routes.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let health_routes = Router::new()
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(ledger_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn rate_limit_middleware(
    State(limiter): State<Arc<DefaultDirectRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(request).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after = wait.as_secs().max(1);
            warn!(path = %request.uri().path(), retry_after, "Rate limit exceeded");

            AppError::RateLimited { retry_after }.into_response()
        }
    }
}
