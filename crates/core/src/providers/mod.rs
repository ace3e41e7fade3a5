pub mod registry;
pub mod traits;

// API provider implementations
pub mod alphavantage;
pub mod coincap;
pub mod frankfurter;
pub mod yahoo_finance;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Convert a provider float into a price. Non-finite and negative values are rejected.
pub(crate) fn price_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Decimal::from_f64(value)
}

/// Parse a provider price string ("185.2300", "43123.123456789012345").
pub(crate) fn price_from_str(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    let parsed = Decimal::from_str(trimmed)
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(price_from_f64))?;
    (parsed >= Decimal::ZERO).then_some(parsed)
}
