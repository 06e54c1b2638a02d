//! Custom validators used by `#[validate(custom(function = "..."))]`.

use std::borrow::Cow;

use rust_decimal::Decimal;
use service_core::fineract::dates::parse_iso_date;
use service_core::fineract::jobs::is_valid_cron;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// A positive integer identifier, typically a select value.
pub fn validate_id(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(()),
        _ => Err(error("id", "Select a value")),
    }
}

/// `yyyy-mm-dd`, as sent by `<input type="date">`.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_iso_date(value)
        .map(|_| ())
        .ok_or_else(|| error("date", "Enter a date as yyyy-mm-dd"))
}

pub fn validate_amount(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<Decimal>() {
        Ok(amount) if amount > Decimal::ZERO => Ok(()),
        Ok(_) => Err(error("amount", "Amount must be greater than zero")),
        Err(_) => Err(error("amount", "Enter a number")),
    }
}

/// A non-negative whole number, such as an age in days.
pub fn validate_count(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Ok(()),
        _ => Err(error("count", "Enter a whole number of zero or more")),
    }
}

pub fn validate_cron(value: &str) -> Result<(), ValidationError> {
    if is_valid_cron(value) {
        Ok(())
    } else {
        Err(error("cron", "Enter a cron expression with six or seven fields"))
    }
}
