// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" cell handling (locale numbers, id
// tokens, Y/N flags, year tokens in file names) so the rest of the code can
// assume clean, typed values.
use crate::config::NumberPolicy;
use crate::types::Year;
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{4}").expect("valid year regex"));

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in statistics exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_number(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Apply `policy` to a cell. The flag tells whether the cell was non-empty
/// but failed to parse, so callers can count coercion failures.
pub fn coerce_number(s: Option<&str>, policy: NumberPolicy) -> (Option<f64>, bool) {
    let parsed = parse_number(s);
    let blank = s.map(|v| v.trim().is_empty()).unwrap_or(true);
    let failed = parsed.is_none() && !blank;
    let value = match (parsed, policy) {
        (Some(v), _) => Some(v),
        (None, NumberPolicy::Missing) => None,
        (None, NumberPolicy::Zero) => Some(0.0),
    };
    (value, failed)
}

/// First run of four ASCII digits in a file name.
pub fn extract_year(file_name: &str) -> Year {
    YEAR_RE
        .find(file_name)
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map(Year::Known)
        .unwrap_or(Year::Unknown)
}

/// Normalize an id token so `"1"`, `" 1 "` and `"1.0"` compare equal.
pub fn normalize_id(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Spreadsheet exports sometimes write integer ids as floats.
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
            return Some(format!("{}", f as i64));
        }
    }
    Some(s.to_string())
}

/// `Y`/`y`/`true`/`1` style flags.
pub fn parse_flag(s: Option<&str>) -> bool {
    matches!(
        s.map(|v| v.trim().to_ascii_uppercase()).as_deref(),
        Some("Y") | Some("YES") | Some("TRUE") | Some("1")
    )
}

/// Trimmed, non-empty text.
pub fn clean_text(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Case-insensitive substring match; a missing haystack never matches.
pub fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

pub fn percent(part: f64, whole: f64) -> f64 {
    // Share of `whole` in percent; 0 when there is nothing to divide.
    if whole.abs() < f64::EPSILON {
        return 0.0;
    }
    part / whole * 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Format an optional amount, `-` when missing.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_strips_thousands_separators() {
        assert_eq!(parse_number(Some("12,345")), Some(12345.0));
        assert_eq!(parse_number(Some(" 1,234,567.5 ")), Some(1234567.5));
        assert_eq!(parse_number(Some("-3")), Some(-3.0));
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(Some("n/a")), None);
        assert_eq!(parse_number(Some("-")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_coerce_number_policies() {
        assert_eq!(
            coerce_number(Some("1,000"), NumberPolicy::Missing),
            (Some(1000.0), false)
        );
        assert_eq!(coerce_number(Some("x"), NumberPolicy::Missing), (None, true));
        assert_eq!(
            coerce_number(Some("x"), NumberPolicy::Zero),
            (Some(0.0), true)
        );
    }

    #[test]
    fn test_blank_cells_are_not_coercion_failures() {
        assert_eq!(coerce_number(Some(""), NumberPolicy::Missing), (None, false));
        assert_eq!(coerce_number(Some("  "), NumberPolicy::Missing), (None, false));
        assert_eq!(coerce_number(None, NumberPolicy::Missing), (None, false));
        assert_eq!(coerce_number(Some(""), NumberPolicy::Zero), (Some(0.0), false));
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("report_2023.csv"), Year::Known(2023));
        assert_eq!(extract_year("관세환급_20251211.xlsx"), Year::Known(2025));
        assert_eq!(extract_year("관세환급 통계.csv"), Year::Unknown);
        assert_eq!(extract_year("v123.csv"), Year::Unknown);
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(Some("1.0")), Some("1".to_string()));
        assert_eq!(normalize_id(Some(" 10 ")), Some("10".to_string()));
        assert_eq!(normalize_id(Some("KR")), Some("KR".to_string()));
        assert_eq!(normalize_id(Some("  ")), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("Y")));
        assert!(parse_flag(Some(" y ")));
        assert!(!parse_flag(Some("N")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_contains_ci_is_missing_safe() {
        assert!(contains_ci(Some("Republic of Korea"), "korea"));
        assert!(!contains_ci(None, "korea"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_opt(None, 0), "-");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
