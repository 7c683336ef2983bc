//! Bucket alignment for balance histories.
//!
//! All boundaries are computed in UTC: days start at midnight, weeks on
//! Monday (ISO 8601), months on the 1st.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};

use super::types::Granularity;

/// Truncate `instant` to the start of the bucket that contains it.
#[must_use]
pub fn align_to_bucket_start(instant: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    let date = instant.date_naive();
    let bucket_date = match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Monthly => date - Duration::days(i64::from(date.day0())),
    };
    bucket_date.and_time(NaiveTime::MIN).and_utc()
}

/// Start of the bucket following an aligned `bucket_start`.
///
/// Returns `None` only when the next boundary falls outside the range chrono
/// can represent.
#[must_use]
pub fn next_bucket_start(
    bucket_start: DateTime<Utc>,
    granularity: Granularity,
) -> Option<DateTime<Utc>> {
    match granularity {
        Granularity::Daily => bucket_start.checked_add_signed(Duration::days(1)),
        Granularity::Weekly => bucket_start.checked_add_signed(Duration::days(7)),
        // Monthly buckets always sit on day 1, so no day-of-month clamping occurs
        Granularity::Monthly => bucket_start.checked_add_months(Months::new(1)),
    }
}

/// Number of bucket starts between the bucket containing `start` and `end`,
/// inclusive. Computed arithmetically so oversized ranges cost nothing.
#[must_use]
pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>, granularity: Granularity) -> u64 {
    let first = align_to_bucket_start(start, granularity);
    if end < first {
        return 0;
    }
    let (from, to) = (first.date_naive(), end.date_naive());
    let span = match granularity {
        Granularity::Daily => to.signed_duration_since(from).num_days(),
        Granularity::Weekly => to.signed_duration_since(from).num_days() / 7,
        Granularity::Monthly => {
            i64::from(to.year() - from.year()) * 12 + i64::from(to.month0())
                - i64::from(from.month0())
        }
    };
    u64::try_from(span).map_or(0, |span| span + 1)
}
