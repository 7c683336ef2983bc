//! Application entry point.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lp_token_ledger::api::{
    DEFAULT_REQUEST_TIMEOUT, RateLimitConfig, RouterOptions, create_router_with_options,
};
use lp_token_ledger::app::AppState;
use lp_token_ledger::domain::DatabaseClient;
use lp_token_ledger::infra::{PostgresClient, PostgresConfig};

/// Application configuration
struct Config {
    database_url: SecretString,
    host: String,
    port: u16,
    /// Emit JSON log lines instead of the human-readable format
    json_logs: bool,
    enable_rate_limiting: bool,
    rate_limit_config: RateLimitConfig,
    request_timeout: Duration,
    postgres_config: PostgresConfig,
    run_migrations: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map(SecretString::from)
            .context("DATABASE_URL not set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let enable_rate_limiting = env_flag("ENABLE_RATE_LIMITING", false);
        let rate_limit_config = RateLimitConfig::from_env();
        let request_timeout = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let mut postgres_config = PostgresConfig::default();
        if let Some(max) = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            postgres_config.max_connections = max;
            postgres_config.min_connections = postgres_config.min_connections.min(max);
        }
        if let Some(secs) = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            postgres_config.acquire_timeout = Duration::from_secs(secs);
        }

        let run_migrations = env_flag("RUN_MIGRATIONS", true);

        Ok(Self {
            database_url,
            host,
            port,
            json_logs,
            enable_rate_limiting,
            rate_limit_config,
            request_timeout,
            postgres_config,
            run_migrations,
        })
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn init_tracing(json_logs: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    info!("LP Token Ledger v{}", env!("CARGO_PKG_VERSION"));
    info!("Initializing infrastructure...");

    let postgres_client = PostgresClient::new(
        config.database_url.expose_secret(),
        config.postgres_config.clone(),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;

    if config.run_migrations {
        postgres_client
            .run_migrations()
            .await
            .context("Failed to apply migrations")?;
        info!("   ✓ Database connected and migrations applied");
    } else {
        info!("   ✓ Database connected (migrations skipped)");
    }

    let postgres_client = Arc::new(postgres_client);
    let app_state = Arc::new(AppState::new(
        Arc::clone(&postgres_client) as _,
        Arc::clone(&postgres_client) as _,
        Arc::clone(&postgres_client) as _,
    ));

    let rate_limit = if config.enable_rate_limiting {
        info!(
            "   ✓ Rate limiting enabled ({} rps, burst {})",
            config.rate_limit_config.requests_per_second, config.rate_limit_config.burst_size
        );
        Some(config.rate_limit_config)
    } else {
        info!("   ○ Rate limiting disabled");
        None
    };

    let router = create_router_with_options(
        app_state,
        RouterOptions {
            rate_limit,
            request_timeout: config.request_timeout,
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server starting on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
