//! Fixed-point amount handling.
//!
//! LP token amounts are stored as `NUMERIC(38, 8)` and always leave the
//! service as strings with exactly eight fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits carried by every LP token amount
pub const AMOUNT_SCALE: u32 = 8;

/// Normalize an amount to exactly [`AMOUNT_SCALE`] fractional digits.
#[must_use]
pub fn normalize_amount(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(AMOUNT_SCALE);
    rounded
}

/// Render an amount as a fixed 8-digit decimal string, e.g. `125.00000000`.
#[must_use]
pub fn format_amount(value: Decimal) -> String {
    normalize_amount(value).to_string()
}

/// Serde adapter for `Decimal` fields that travel as fixed 8-digit strings.
pub mod fixed8 {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_amount(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Decimal::from_str(&raw).map_err(de::Error::custom)
    }
}
