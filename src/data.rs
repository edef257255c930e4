//! Cell values and lenient value coercion.
//!
//! Spreadsheet cells are loosely typed: a revenue column may hold numbers in
//! one row and `"R$ 1.234,56"` in the next, and dates show up either as
//! spreadsheet serials or as free text. Every coercion here is total: bad
//! input yields `0` (numbers) or `None` (dates), never an error.

use std::{fmt, sync::LazyLock};

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Largest serial the 1900 date system can express (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_465.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

static CURRENCY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\$\s?").expect("currency marker pattern is valid"));

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Cell {
    /// True for cells a blank-row check ignores: empty, or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cells that stringify to `default` when used as a grouping key.
    fn is_falsy(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(n) => *n == 0.0 || n.is_nan(),
            Cell::Bool(b) => !b,
            Cell::DateTime(_) => false,
        }
    }

    /// Stringifies the cell, substituting `default` for empty, zero, or false cells.
    ///
    /// The result is not trimmed; callers that group on it trim explicitly.
    pub fn label(&self, default: &str) -> String {
        if self.is_falsy() {
            return default.to_string();
        }
        self.as_display()
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Parses a currency-like cell such as `"R$ 1.234,56"` into a number.
///
/// Dots are thousands separators only when a comma appears after them;
/// otherwise a dot is kept as the decimal point.
pub fn parse_currency(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Text(raw) => parse_currency_text(raw),
        _ => 0.0,
    }
}

pub fn parse_currency_text(raw: &str) -> f64 {
    let stripped = CURRENCY_MARKER.replace_all(raw, "");
    let first_comma = stripped.find(',');
    let mut cleaned = String::with_capacity(stripped.len());
    for (idx, ch) in stripped.char_indices() {
        match ch {
            '.' if first_comma.is_some_and(|comma| comma > idx) => {}
            ',' => cleaned.push('.'),
            other => cleaned.push(other),
        }
    }
    parse_float_prefix(&cleaned).unwrap_or(0.0)
}

/// Parses an integer-like cell; numbers are floored, text reads its leading digits.
pub fn parse_integer(cell: &Cell) -> i64 {
    match cell {
        Cell::Number(n) => n.floor() as i64,
        Cell::Text(raw) => parse_integer_prefix(raw).unwrap_or(0),
        _ => 0,
    }
}

/// Normalizes a date-like cell into a calendar date and time.
///
/// Positive numbers are spreadsheet serials; text goes through
/// [`parse_date_text`]; anything else has no date.
pub fn parse_calendar_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Number(n) if *n > 0.0 => excel_serial_to_datetime(*n),
        Cell::Text(raw) => parse_date_text(raw),
        Cell::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

/// Converts a 1900-system spreadsheet serial into a date and time.
///
/// Serial 60 is the phantom 1900-02-29, which rolls over to March 1st.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_DATE_SERIAL {
        return None;
    }
    let mut days = serial.trunc() as u64;
    let exact_seconds = SECONDS_PER_DAY * serial.fract();
    let mut seconds = exact_seconds.floor() as u32;
    if exact_seconds - f64::from(seconds) > 0.9999 {
        seconds += 1;
        if seconds == 86_400 {
            seconds = 0;
            days += 1;
        }
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    let date = match days {
        0..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_days(Days::new(days))?,
        60 => NaiveDate::from_ymd_opt(1900, 3, 1)?,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))?,
    };
    Some(date.and_time(time))
}

/// Generic date parsing for free-text cells.
pub fn parse_date_text(raw: &str) -> Option<NaiveDateTime> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%Y/%m/%d",
        "%B %d, %Y",
        "%b %d, %Y",
        "%B %d %Y",
        "%b %d %Y",
        "%d %B %Y",
        "%d %b %Y",
    ];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];

    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.naive_local());
    }
    // Year-month only, e.g. "2024-03".
    if value.len() == 7
        && let Ok(date) = NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
    {
        return Some(date.and_time(NaiveTime::MIN));
    }
    None
}

fn trim_leading_whitespace(value: &str) -> &str {
    value.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Parses the longest floating-point prefix of `value`, like `"12.5abc"` → 12.5.
fn parse_float_prefix(value: &str) -> Option<f64> {
    let s = trim_leading_whitespace(value);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut cursor = end + 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        let fraction_digits = cursor - end - 1;
        if digits + fraction_digits > 0 {
            end = cursor;
            digits += fraction_digits;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// Parses the leading base-10 digit run of `value`, like `"42abc"` → 42.
fn parse_integer_prefix(value: &str) -> Option<i64> {
    let s = trim_leading_whitespace(value);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    let literal = &s[..end];
    literal
        .parse::<i64>()
        .ok()
        .or_else(|| literal.parse::<f64>().ok().map(|wide| wide as i64))
}
