//! Cron normalization and parsing helpers.

use std::str::FromStr;

use cron::Schedule;

/// Normalize a cron expression for the `cron` crate.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Standard 5-field expressions get `0` prepended for seconds. Quartz-style
/// `?` ("no specific value") is rewritten to `*`.
pub fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim().replace('?', "*");
    let field_count = trimmed.split_whitespace().count();
    if field_count == 5 {
        format!("0 {}", trimmed)
    } else {
        // Already 6-field or non-standard; pass through as-is.
        trimmed
    }
}

/// Parse a 5- or 6-field cron expression.
pub(crate) fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalize_cron(expr))
}
