use crate::dataset::CellValue;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

/// Full month names, January first. Month dropdowns and labels always use
/// these spellings regardless of how the source cell spelled the month.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// Date string formats seen in dealer sheets, tried in order.
const DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d.%m.%Y"];

lazy_static! {
    // Compact dates like 20250812 (YYYYMMDD), a common export quirk.
    static ref COMPACT_DATE: Regex = Regex::new(r"^\d{8}$").unwrap();
}

/// Try to read a calendar date out of a text cell.
///
/// Recognizes `YYYYMMDD` digit runs and the usual slash/dash/dot formats.
/// Returns `None` for anything that does not parse cleanly.
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    if COMPACT_DATE.is_match(t) {
        return NaiveDate::parse_from_str(t, "%Y%m%d").ok();
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

/// Try to read a compact `YYYYMMDD` date out of a numeric cell
/// (integers like `20250812` or floats like `20250812.0`).
pub fn parse_date_number(n: f64) -> Option<NaiveDate> {
    if n.fract() != 0.0 {
        return None;
    }
    let i = n as i64;
    if !(10_000_000..=99_999_999).contains(&i) {
        return None;
    }
    parse_date_text(&i.to_string())
}

/// Resolve a user- or sheet-supplied month spelling to its canonical name.
///
/// Accepts full names and three-letter abbreviations, case-insensitively,
/// so `jan`, `Jan` and `January` all resolve to `"January"`.
pub fn resolve_month_name(s: &str) -> Option<&'static str> {
    let t = s.trim();
    if let Some(i) = MONTH_NAMES.iter().position(|m| m.eq_ignore_ascii_case(t)) {
        return Some(MONTH_NAMES[i]);
    }
    let prefix = t.get(..3)?;
    MONTH_ABBREVS
        .iter()
        .position(|a| a.eq_ignore_ascii_case(prefix))
        .map(|i| MONTH_NAMES[i])
}

/// Month name a cell belongs to, if any.
///
/// Dates answer directly; numbers and text go through the compact-date and
/// month-spelling coercions above.
pub fn month_name(value: &CellValue) -> Option<&'static str> {
    match value {
        CellValue::Date(d) => Some(MONTH_NAMES[d.month0() as usize]),
        CellValue::Number(n) => parse_date_number(*n).map(|d| MONTH_NAMES[d.month0() as usize]),
        CellValue::Text(s) => parse_date_text(s)
            .map(|d| MONTH_NAMES[d.month0() as usize])
            .or_else(|| resolve_month_name(s)),
        CellValue::Empty => None,
    }
}
