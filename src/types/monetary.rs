use crate::types::errors::MonetaryError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a monetary column value into an exact decimal.
///
/// Plain notation (`"181.00"`) is tried first; exported spreadsheets occasionally carry
/// scientific notation (`"1.5e6"`), which is accepted as a fallback. Sign is preserved so the
/// caller can decide whether a negative value is a rejection.
pub fn parse_monetary(value: &str) -> Result<Decimal, MonetaryError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(MonetaryError::Empty);
    }

    if let Ok(decimal) = Decimal::from_str(value) {
        return Ok(decimal.normalize());
    }

    Decimal::from_scientific(value)
        .map(|decimal| decimal.normalize())
        .map_err(|_| MonetaryError::InvalidFormat(value.to_string()))
}

/// Lossy conversion used only once amounts enter the scoring stage.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
