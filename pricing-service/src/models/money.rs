//! Fixed-point money helpers.
//!
//! Every monetary value leaving the service carries exactly two fractional
//! digits, rounded half-to-even.

use rust_decimal::{Decimal, RoundingStrategy};
use std::borrow::Cow;
use validator::ValidationError;

/// Number of fractional digits used for money.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount that fits `NUMERIC(10,2)`.
const MAX_INTEGER_DIGITS: u32 = 8;

/// Round to cents (half-to-even) and pad to two fractional digits.
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(MONEY_SCALE);
    rounded
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn check_precision(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(error(
            "max_decimal_places",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    if value.trunc().abs() >= Decimal::from(10_u64.pow(MAX_INTEGER_DIGITS)) {
        return Err(error(
            "max_whole_digits",
            "Ensure that there are no more than 8 digits before the decimal point.",
        ));
    }
    Ok(())
}

/// Non-negative amount with at most two decimal places.
pub fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(error(
            "min_value",
            "Ensure this value is greater than or equal to 0.00.",
        ));
    }
    check_precision(value)
}

/// Percentage in `[0, 100]` with at most two decimal places.
pub fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(error(
            "min_value",
            "Ensure this value is greater than or equal to 0.00.",
        ));
    }
    if *value > Decimal::ONE_HUNDRED {
        return Err(error(
            "max_value",
            "Ensure this value is less than or equal to 100.00.",
        ));
    }
    check_precision(value)
}
