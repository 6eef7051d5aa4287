//! Parsing of the values a user types when adding an item.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::api::InspectLink;
use crate::core::error::{WatchError, WatchResult};

pub fn parse_link(text: &str) -> WatchResult<InspectLink> {
    Ok(InspectLink::parse(text)?)
}

/// Target float in `[0, 1]`; `,` is accepted as decimal separator.
pub fn parse_float(text: &str) -> WatchResult<f64> {
    let normalized = text.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| WatchError::InvalidInput(format!("not a float value: {:?}", text)))?;

    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(WatchError::InvalidInput(format!(
            "float must be between 0 and 1, got {}",
            value
        )));
    }
    Ok(value)
}

/// Positive target price, optionally prefixed with a currency sign.
pub fn parse_price(text: &str) -> WatchResult<Decimal> {
    let trimmed = text.trim();
    let stripped = trimmed
        .strip_prefix(['$', '€', '£'])
        .unwrap_or(trimmed)
        .trim();
    let normalized = stripped.replace(',', ".");

    let value = Decimal::from_str(&normalized)
        .map_err(|_| WatchError::InvalidInput(format!("not a price: {:?}", text)))?;

    if value <= Decimal::ZERO {
        return Err(WatchError::InvalidInput(format!("price must be positive, got {}", value)));
    }
    Ok(value)
}
