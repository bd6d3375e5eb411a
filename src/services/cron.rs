//! Five-field cron expression validation and the timezone catalog.
//!
//! The remote system owns the schedule clock; this module only checks that
//! an expression is syntactically acceptable before it is sent.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::{GlsError, Result};

/// Per-field syntax: `*`, numbers, ranges, comma lists, optional `/step`.
/// Bounds are enforced by the numeric alternations per field.
const FIELD_PATTERNS: [(&str, &str); 5] = [
    (
        "minute",
        r"^(\*|([0-9]|[1-5][0-9])(-([0-9]|[1-5][0-9]))?(,([0-9]|[1-5][0-9])(-([0-9]|[1-5][0-9]))?)*)(/[0-9]+)?$",
    ),
    (
        "hour",
        r"^(\*|([0-9]|1[0-9]|2[0-3])(-([0-9]|1[0-9]|2[0-3]))?(,([0-9]|1[0-9]|2[0-3])(-([0-9]|1[0-9]|2[0-3]))?)*)(/[0-9]+)?$",
    ),
    (
        "day of month",
        r"^(\*|([1-9]|[12][0-9]|3[01])(-([1-9]|[12][0-9]|3[01]))?(,([1-9]|[12][0-9]|3[01])(-([1-9]|[12][0-9]|3[01]))?)*)(/[0-9]+)?$",
    ),
    (
        "month",
        r"^(\*|([1-9]|1[0-2])(-([1-9]|1[0-2]))?(,([1-9]|1[0-2])(-([1-9]|1[0-2]))?)*)(/[0-9]+)?$",
    ),
    (
        "day of week",
        r"^(\*|[0-6](-[0-6])?(,[0-6](-[0-6])?)*)(/[0-9]+)?$",
    ),
];

fn field_regexes() -> &'static Vec<(&'static str, Regex)> {
    static REGEXES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        FIELD_PATTERNS
            .iter()
            .map(|(name, pattern)| (*name, Regex::new(pattern).expect("static cron pattern")))
            .collect()
    })
}

/// Validate a five-field cron expression.
///
/// # Errors
/// Returns [`GlsError::InvalidCron`] naming the offending field.
pub fn validate_cron(expression: &str) -> Result<()> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(GlsError::InvalidCron {
            details: format!("expected 5 fields, got {}", fields.len()),
        });
    }

    for ((name, regex), &field) in field_regexes().iter().zip(&fields) {
        if !regex.is_match(field) {
            return Err(GlsError::InvalidCron {
                details: format!("invalid {name} field: {field}"),
            });
        }
    }
    Ok(())
}

/// Timezones offered by the schedule form dropdown.
pub const COMMON_TIMEZONES: [&str; 26] = [
    "UTC",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Toronto",
    "America/Vancouver",
    "America/Sao_Paulo",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Amsterdam",
    "Europe/Madrid",
    "Europe/Rome",
    "Europe/Moscow",
    "Europe/Kiev",
    "Asia/Dubai",
    "Asia/Kolkata",
    "Asia/Singapore",
    "Asia/Hong_Kong",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Asia/Seoul",
    "Australia/Sydney",
    "Australia/Melbourne",
    "Pacific/Auckland",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_expressions() {
        for expr in [
            "* * * * *",
            "0 0 * * *",
            "*/15 * * * *",
            "0 8 * * 1-5",
            "0 */2 * * *",
            "30 4 1,15 * *",
            "5 0 * 8 *",
        ] {
            assert!(validate_cron(expr).is_ok(), "should accept: {expr}");
        }
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(validate_cron("* * * *").is_err());
        assert!(validate_cron("* * * * * *").is_err());
        assert!(validate_cron("").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(validate_cron("60 * * * *").is_err());
        assert!(validate_cron("* 24 * * *").is_err());
        assert!(validate_cron("* * 0 * *").is_err());
        assert!(validate_cron("* * 32 * *").is_err());
        assert!(validate_cron("* * * 13 *").is_err());
        assert!(validate_cron("* * * * 7").is_err());
    }

    #[test]
    fn rejects_garbage_fields() {
        assert!(validate_cron("a b c d e").is_err());
        assert!(validate_cron("0 0 * * mon").is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = validate_cron("* 99 * * *").unwrap_err();
        assert!(err.to_string().contains("hour"), "got: {err}");
    }

    #[test]
    fn timezone_catalog_starts_with_utc() {
        assert_eq!(COMMON_TIMEZONES[0], "UTC");
    }
}
