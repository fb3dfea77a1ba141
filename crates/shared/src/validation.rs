//! Common validation utilities.

use chrono::{DateTime, Duration, Utc};
use validator::ValidationError;

/// Longest bookable time range (one week).
const MAX_RANGE_DAYS: i64 = 7;

/// Validates that a string is not empty after trimming whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates an ISO 4217 style currency code (three uppercase ASCII letters).
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency_code");
        err.message = Some("Currency must be a three-letter uppercase code".into());
        Err(err)
    }
}

/// Validates that a price is non-negative.
pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("price_range");
        err.message = Some("Price must be non-negative".into());
        Err(err)
    }
}

/// Validates that `start` is strictly before `end` and the range is not
/// longer than a week.
pub fn validate_time_order(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if start >= end {
        let mut err = ValidationError::new("time_order");
        err.message = Some("start_time must be before end_time".into());
        return Err(err);
    }

    if end - start > Duration::days(MAX_RANGE_DAYS) {
        let mut err = ValidationError::new("time_span");
        err.message = Some("A booking cannot span more than 7 days".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Studio A").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("USD").is_ok());
        assert!(validate_currency_code("EUR").is_ok());
        assert!(validate_currency_code("usd").is_err());
        assert!(validate_currency_code("US").is_err());
        assert!(validate_currency_code("USDT").is_err());
    }

    #[test]
    fn test_validate_currency_code_error_message() {
        let err = validate_currency_code("x").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Currency must be a three-letter uppercase code"
        );
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(25.5).is_ok());
        assert!(validate_price(-0.01).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_time_order() {
        assert!(validate_time_order(at(10, 0), at(11, 0)).is_ok());
        assert!(validate_time_order(at(11, 0), at(10, 0)).is_err());
        assert!(validate_time_order(at(10, 0), at(10, 0)).is_err());
    }

    #[test]
    fn test_validate_time_order_too_long() {
        let start = at(10, 0);
        let end = start + Duration::days(8);
        let err = validate_time_order(start, end).unwrap_err();
        assert_eq!(err.code, "time_span");
    }
}
