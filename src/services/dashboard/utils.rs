use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{CellValue, MISSING_LABEL};

/// Exclusive bounds of the day counts read as Excel serial dates.
pub const EXCEL_SERIAL_MIN: f64 = 25569.0;
pub const EXCEL_SERIAL_MAX: f64 = 2958466.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

static STRICT_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("numeric pattern is valid")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Whole-string numeric test shared by classification, aggregation and filtering.
/// `"42"`, `" -1.5 "` and `"1e3"` pass; `"42abc"` and `"12/05/2024"` do not.
pub fn parse_number_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if !STRICT_NUMBER.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_number_str(s),
        _ => None,
    }
}

/// Number text as a JavaScript `String(n)` would print it, so labels stay stable
/// across sources: exponent notation at or above 1e21 and below 1e-6, no `-0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude.is_finite() && (magnitude >= 1e21 || magnitude < 1e-6) {
        let exponent = format!("{:e}", n);
        return match exponent.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exponent,
        };
    }
    n.to_string()
}

/// Day counts in this open range are treated as dates rather than measurements.
pub fn is_excel_serial_date(n: f64) -> bool {
    n > EXCEL_SERIAL_MIN && n < EXCEL_SERIAL_MAX
}

/// `1970-01-01 + round((n - 25569) days)` at millisecond precision, in UTC.
pub fn excel_serial_to_datetime(n: f64) -> Option<NaiveDateTime> {
    let millis = ((n - EXCEL_SERIAL_MIN) * MILLIS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

pub fn is_date_string(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    if DateTime::parse_from_rfc3339(s).is_ok() || DateTime::parse_from_rfc2822(s).is_ok() {
        return true;
    }

    DATE_FORMATS
        .iter()
        .any(|format| NaiveDate::parse_from_str(s, format).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
}

pub fn is_date_value(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => is_date_string(s),
        CellValue::Number(n) => is_excel_serial_date(*n),
        CellValue::Empty => false,
    }
}

/// Grouping key for a cell. Serial dates become localized dates, blanks become `"N/A"`.
pub fn normalize_label(cell: &CellValue, date_format: &str) -> String {
    match cell {
        CellValue::Number(n) if is_excel_serial_date(*n) => excel_serial_to_datetime(*n)
            .map(|dt| dt.format(date_format).to_string())
            .unwrap_or_else(|| format_number(*n)),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => s.clone(),
        CellValue::Empty => MISSING_LABEL.to_string(),
    }
}

/// Header text for column `idx`. Blank headers get a positional name and repeats get a suffix.
pub fn unique_header(raw: &str, idx: usize, existing_names: &mut HashSet<String>) -> String {
    let trimmed = raw.trim();
    let base = if trimmed.is_empty() {
        format!("col_{}", idx + 1)
    } else {
        trimmed.to_string()
    };

    let mut name = base.clone();
    let mut counter = 1;
    while !existing_names.insert(name.clone()) {
        name = format!("{}_{}", base, counter);
        counter += 1;
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_numbers_only() {
        assert_eq!(parse_number_str("42"), Some(42.0));
        assert_eq!(parse_number_str(" -1.5 "), Some(-1.5));
        assert_eq!(parse_number_str("1e3"), Some(1000.0));
        assert_eq!(parse_number_str(".5"), Some(0.5));
        assert_eq!(parse_number_str("42abc"), None);
        assert_eq!(parse_number_str("12/05/2024"), None);
        assert_eq!(parse_number_str("NaN"), None);
        assert_eq!(parse_number_str("inf"), None);
        assert_eq!(parse_number(&CellValue::Number(f64::NAN)), None);
    }

    #[test]
    fn serial_range_is_exclusive() {
        assert!(!is_excel_serial_date(25569.0));
        assert!(is_excel_serial_date(25570.0));
        assert!(is_excel_serial_date(45000.5));
        assert!(!is_excel_serial_date(2958466.0));
        assert!(!is_excel_serial_date(150.0));
    }

    #[test]
    fn serial_converts_to_calendar_date() {
        let dt = excel_serial_to_datetime(45306.0).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");
        assert_eq!(
            normalize_label(&CellValue::Number(45306.0), "%d/%m/%Y"),
            "15/01/2024"
        );
    }

    #[test]
    fn recognises_date_strings() {
        assert!(is_date_string("2024-01-15"));
        assert!(is_date_string("15/01/2024"));
        assert!(is_date_string("2024-01-15T10:30:00Z"));
        assert!(is_date_string("Jan 15, 2024"));
        assert!(!is_date_string("Norte"));
        assert!(!is_date_string("42"));
    }

    #[test]
    fn labels_for_plain_cells() {
        assert_eq!(normalize_label(&CellValue::Number(5.0), "%d/%m/%Y"), "5");
        assert_eq!(normalize_label(&CellValue::Number(1.5), "%d/%m/%Y"), "1.5");
        assert_eq!(normalize_label(&CellValue::Number(1e21), "%d/%m/%Y"), "1e+21");
        assert_eq!(normalize_label(&CellValue::Empty, "%d/%m/%Y"), "N/A");
        assert_eq!(normalize_label(&CellValue::Text("Sul".into()), "%d/%m/%Y"), "Sul");
    }

    #[test]
    fn headers_are_made_unique() {
        let mut seen = HashSet::new();
        assert_eq!(unique_header("Valor", 0, &mut seen), "Valor");
        assert_eq!(unique_header(" Valor ", 1, &mut seen), "Valor_1");
        assert_eq!(unique_header("", 2, &mut seen), "col_3");
    }

    #[test]
    fn numbers_print_like_javascript() {
        assert_eq!(format_number(10.5), "10.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }
}
