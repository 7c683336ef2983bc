//! Balance replay over an ordered ledger.
//!
//! Events are folded into one running-balance point per bucket in a single
//! forward pass. The caller supplies events already filtered to the subject
//! and range and sorted ascending by timestamp; nothing here re-sorts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::interval::{align_to_bucket_start, next_bucket_start};
use super::types::{BalancePoint, Granularity, LedgerEvent};

/// Replay `events` into bucketed balance points ending at `range_end`, or now.
#[must_use]
pub fn replay(
    events: &[LedgerEvent],
    granularity: Granularity,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
) -> Vec<BalancePoint> {
    replay_as_of(events, granularity, range_start, range_end, Utc::now())
}

/// Same as [`replay`], with the open-ended range closed at `now`.
#[must_use]
pub fn replay_as_of(
    events: &[LedgerEvent],
    granularity: Granularity,
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<BalancePoint> {
    let Some(first) = events.first() else {
        return Vec::new();
    };

    let effective_end = range_end.unwrap_or(now);
    let mut cursor = Some(align_to_bucket_start(
        range_start.unwrap_or(first.timestamp),
        granularity,
    ));
    let mut running_balance = Decimal::ZERO;
    let mut pending = events.iter().peekable();
    let mut points = Vec::new();

    while let Some(bucket_start) = cursor.filter(|c| *c <= effective_end) {
        // Boundary events belong to the bucket they start
        while let Some(event) = pending.next_if(|e| e.timestamp <= bucket_start) {
            running_balance += event.signed_amount();
        }
        points.push(BalancePoint {
            timestamp: bucket_start,
            balance: running_balance,
        });
        cursor = next_bucket_start(bucket_start, granularity);
    }

    points
}

/// Net balance of every event, with no bucketing.
#[must_use]
pub fn net_balance(events: &[LedgerEvent]) -> Decimal {
    events.iter().map(LedgerEvent::signed_amount).sum()
}
