//! Input validation utilities

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Trim a mandatory field, rejecting it when nothing is left
pub fn required<'a>(name: &str, value: &'a str) -> Result<&'a str, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", name));
    }

    Ok(value)
}

/// Trim an optional field, substituting `default` when it is blank
pub fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}

/// Validate a `YYYYMMDD` schedule date
pub fn validate_date_str(date_str: &str) -> Result<NaiveDate, String> {
    if date_str.len() != 8 {
        return Err("invalid date format".to_string());
    }

    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        DATE_REGEX.get_or_init(|| Regex::new(r"^[0-9]{8}$").expect("Failed to compile date regex"));

    if !regex.is_match(date_str) {
        return Err("invalid date format".to_string());
    }

    NaiveDate::parse_from_str(date_str, "%Y%m%d").map_err(|_| "invalid date value".to_string())
}
