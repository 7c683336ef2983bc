//! Domain types with validation support.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::amount::fixed8;
use super::error::ValidationError;
use super::interval::bucket_count;

/// Kind of ledger event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// LP tokens issued to the subject
    Mint,
    /// LP tokens redeemed by the subject
    Burn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Burn => "burn",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mint" => Ok(Self::Mint),
            "burn" => Ok(Self::Burn),
            _ => Err(format!("Invalid event kind: {}", s)),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucket width of a balance history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One bucket per UTC day
    #[default]
    Daily,
    /// One bucket per ISO week, starting Monday 00:00 UTC
    Weekly,
    /// One bucket per calendar month, starting on the 1st
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ValidationError::UnknownGranularity(s.to_string())),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable mint/burn fact from the LP token ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// Storage identity
    pub id: Uuid,
    /// Subject (user/account) the event belongs to
    #[schema(example = "user-42")]
    pub subject_id: String,
    /// Non-negative amount with 8 fractional digits
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "100.00000000")]
    pub amount: Decimal,
    /// Mint or burn
    pub kind: EventKind,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// Opaque provenance (transaction hash, policy id, ...)
    pub reference: String,
}

impl LedgerEvent {
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        kind: EventKind,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            amount,
            kind,
            timestamp,
            reference: String::new(),
        }
    }

    #[must_use]
    pub fn mint(subject_id: impl Into<String>, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self::new(subject_id, EventKind::Mint, amount, timestamp)
    }

    #[must_use]
    pub fn burn(subject_id: impl Into<String>, amount: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self::new(subject_id, EventKind::Burn, amount, timestamp)
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    /// Contribution of this event to a running balance
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            EventKind::Mint => self.amount,
            EventKind::Burn => -self.amount,
        }
    }
}

/// A position currently held by a subject
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,
    pub subject_id: String,
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "125.00000000")]
    pub amount: Decimal,
    pub acquired_at: DateTime<Utc>,
}

impl Holding {
    #[must_use]
    pub fn new(subject_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            amount,
            acquired_at: Utc::now(),
        }
    }
}

/// Running balance at the start of one bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BalancePoint {
    /// Bucket-start instant
    pub timestamp: DateTime<Utc>,
    /// Balance with exactly 8 fractional digits
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "150.00000000")]
    pub balance: Decimal,
}

/// `rangeStart` travels as the literal `"N/A"` when nothing anchors the range
mod range_start {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const NOT_AVAILABLE: &str = "N/A";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(instant) => serializer.serialize_str(&instant.to_rfc3339()),
            None => serializer.serialize_str(NOT_AVAILABLE),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == NOT_AVAILABLE {
            return Ok(None);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(de::Error::custom)
    }
}

/// Reconstructed balance series for one subject
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceHistory {
    #[schema(example = "user-42")]
    pub subject_id: String,
    /// Requested start, else the first event's timestamp, else `"N/A"`
    #[serde(with = "range_start")]
    #[schema(value_type = String, example = "2024-01-01T00:00:00+00:00")]
    pub range_start: Option<DateTime<Utc>>,
    /// Requested end, else the time of the query
    pub range_end: DateTime<Utc>,
    pub granularity: Granularity,
    pub history: Vec<BalancePoint>,
    pub point_count: usize,
    /// Live balance from the holdings view
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "125.00000000")]
    pub current_balance: Decimal,
}

impl BalanceHistory {
    #[must_use]
    pub fn new(
        subject_id: String,
        range_start: Option<DateTime<Utc>>,
        range_end: DateTime<Utc>,
        granularity: Granularity,
        history: Vec<BalancePoint>,
        current_balance: Decimal,
    ) -> Self {
        Self {
            subject_id,
            range_start,
            range_end,
            granularity,
            point_count: history.len(),
            history,
            current_balance,
        }
    }
}

/// Raw query string of the balance history endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceHistoryParams {
    /// ISO-8601 instant or `YYYY-MM-DD`
    #[schema(example = "2024-01-01T00:00:00Z")]
    pub start_date: Option<String>,
    /// ISO-8601 instant or `YYYY-MM-DD`
    #[schema(example = "2024-03-31T00:00:00Z")]
    pub end_date: Option<String>,
    /// `daily` (default), `weekly` or `monthly`
    #[schema(example = "daily")]
    pub interval: Option<String>,
}

/// Upper bound on the points a single history query may produce
pub const MAX_HISTORY_POINTS: u64 = 10_000;

/// Parsed and validated balance history query
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BalanceHistoryQuery {
    #[validate(length(min = 1, max = 128, message = "Subject id must be 1-128 characters"))]
    pub subject_id: String,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: Option<DateTime<Utc>>,
    pub granularity: Granularity,
}

impl BalanceHistoryQuery {
    #[must_use]
    pub fn new(subject_id: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            subject_id: subject_id.into(),
            range_start: None,
            range_end: None,
            granularity,
        }
    }

    #[must_use]
    pub fn with_range(
        mut self,
        range_start: Option<DateTime<Utc>>,
        range_end: Option<DateTime<Utc>>,
    ) -> Self {
        self.range_start = range_start;
        self.range_end = range_end;
        self
    }

    /// Parse the raw query string for `subject_id`.
    pub fn parse(subject_id: &str, params: &BalanceHistoryParams) -> Result<Self, ValidationError> {
        let granularity = match params.interval.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Granularity::default(),
        };
        let range_start = params
            .start_date
            .as_deref()
            .map(|raw| parse_instant("startDate", raw))
            .transpose()?;
        let range_end = params
            .end_date
            .as_deref()
            .map(|raw| parse_instant("endDate", raw))
            .transpose()?;

        Ok(Self {
            subject_id: subject_id.trim().to_string(),
            range_start,
            range_end,
            granularity,
        })
    }

    /// Reject ranges whose end precedes their start
    pub fn check_range(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.range_start, self.range_end)
            && end < start
        {
            return Err(ValidationError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Reject spans that would replay into more than [`MAX_HISTORY_POINTS`] buckets
    pub fn check_point_budget(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let points = bucket_count(start, end, self.granularity);
        if points > MAX_HISTORY_POINTS {
            return Err(ValidationError::TooManyPoints {
                points,
                max: MAX_HISTORY_POINTS,
                granularity: self.granularity.to_string(),
            });
        }
        Ok(())
    }
}

/// Parse an RFC 3339 instant, or a bare date taken as 00:00 UTC.
pub fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ValidationError::InvalidField {
            field: field.to_string(),
            message: format!("'{}' is not an ISO-8601 instant or date", raw),
        })
}

/// Live balance computed from the holdings view alone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBalanceResponse {
    pub subject_id: String,
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "125.00000000")]
    pub current_balance: Decimal,
    pub holding_count: usize,
}

/// Comparison of the replayed ledger balance with the holdings view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub subject_id: String,
    /// Sum of all mints minus all burns
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "125.00000000")]
    pub replayed_balance: Decimal,
    /// Sum of current holdings
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "125.00000000")]
    pub current_balance: Decimal,
    /// `currentBalance - replayedBalance`
    #[serde(with = "fixed8")]
    #[schema(value_type = String, example = "0.00000000")]
    pub discrepancy: Decimal,
    pub consistent: bool,
    pub event_count: usize,
    pub checked_at: DateTime<Utc>,
}

impl ReconciliationReport {
    #[must_use]
    pub fn new(
        subject_id: String,
        replayed_balance: Decimal,
        current_balance: Decimal,
        event_count: usize,
    ) -> Self {
        let discrepancy = current_balance - replayed_balance;
        Self {
            subject_id,
            replayed_balance,
            current_balance,
            discrepancy,
            consistent: discrepancy.is_zero(),
            event_count,
            checked_at: Utc::now(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Ledger store health status
    pub database: HealthStatus,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            database,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "validation_error")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "Unknown granularity 'hourly', expected one of: daily, weekly, monthly")]
    pub message: String,
}

/// Rate limit exceeded response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateLimitResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Seconds until rate limit resets
    #[schema(example = 1)]
    pub retry_after: u64,
}
