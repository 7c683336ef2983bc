//! Domain layer containing core business types, traits, and error definitions.

pub mod amount;
pub mod error;
pub mod interval;
pub mod replay;
pub mod traits;
pub mod types;

pub use amount::{AMOUNT_SCALE, format_amount, normalize_amount};
pub use error::{AppError, DatabaseError, ValidationError};
pub use interval::{align_to_bucket_start, bucket_count, next_bucket_start};
pub use replay::{net_balance, replay, replay_as_of};
pub use traits::{DatabaseClient, EventStoreReader, HoldingsReader};
pub use types::{
    BalanceHistory, BalanceHistoryParams, BalanceHistoryQuery, BalancePoint, MAX_HISTORY_POINTS,
    CurrentBalanceResponse, ErrorDetail, ErrorResponse, EventKind, Granularity, HealthResponse,
    HealthStatus, Holding, LedgerEvent, RateLimitResponse, ReconciliationReport, parse_instant,
};
