use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;

use crate::dates;

/// One scalar cell of an uploaded sheet.
///
/// The parser preserves the source type: numeric cells stay numeric so the
/// Excel export can write typed cells, and date-like cells are promoted to
/// `Date` so month filtering and display formatting behave uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// Human-facing rendering used by the table view, the PDF body and
    /// string cells of the Excel export. Dates print as `DD/MM/YYYY`,
    /// integral numbers without a trailing `.0`, empty cells as `""`.
    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%d/%m/%Y").to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// JSON rendering for `/dealer-data` rows: numbers stay numbers,
    /// everything else becomes its display string.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Value::from(*n as i64)
                } else {
                    Value::from(*n)
                }
            }
            other => Value::from(other.display()),
        }
    }
}

/// Indices of the columns the dashboard treats specially, detected from the
/// header row at upload time. All are optional: a sheet without a dealer or
/// month column still uploads, it just cannot be filtered on that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnRoles {
    pub dealer_name: Option<usize>,
    pub dealer_code: Option<usize>,
    pub month: Option<usize>,
}

// Header comparisons run on a cleaned form: lowercase, underscores and
// dashes folded to spaces, surrounding whitespace dropped.
fn cleaned(header: &str) -> String {
    header
        .to_lowercase()
        .replace(['_', '-'], " ")
        .trim()
        .to_string()
}

impl ColumnRoles {
    /// Detect the dealer-name, dealer-code and month columns.
    ///
    /// Each role is tried in priority order: exact cleaned match first,
    /// then a contains-both-words fallback, mirroring how real dealer
    /// sheets name these columns (`DEALER_NAME`, `Party Name`, `SALE_DATE`...).
    pub fn detect(columns: &[String]) -> Self {
        let lower: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
        let clean: Vec<String> = columns.iter().map(|c| cleaned(c)).collect();

        let dealer_name = clean
            .iter()
            .position(|c| c == "dealer name")
            .or_else(|| lower.iter().position(|c| c.contains("dealer") && c.contains("name")))
            .or_else(|| lower.iter().position(|c| c.contains("party") && c.contains("name")));

        let dealer_code = clean
            .iter()
            .position(|c| matches!(c.as_str(), "dealer code" | "dealercode" | "code"))
            .or_else(|| lower.iter().position(|c| c.contains("dealer") && c.contains("code")));

        let month = lower
            .iter()
            .position(|c| matches!(c.as_str(), "month" | "mnth" | "billing month" | "bill month"))
            .or_else(|| {
                lower.iter().position(|c| {
                    ["sale_date", "sale date", "date", "invoice", "bill"]
                        .iter()
                        .any(|needle| c.contains(needle))
                })
            });

        ColumnRoles {
            dealer_name,
            dealer_code,
            month,
        }
    }
}

/// Normalized in-memory form of one uploaded sheet.
///
/// Immutable once built. Column order follows the spreadsheet; every row is
/// exactly `columns.len()` wide (the parser pads or truncates ragged rows),
/// and column names are unique.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub roles: ColumnRoles,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let roles = ColumnRoles::detect(&columns);
        Dataset {
            columns,
            rows,
            roles,
        }
    }

    /// Distinct dealer names present in the sheet, trimmed and sorted, for
    /// the dealer dropdown. Empty when no dealer-name column was detected.
    pub fn dealer_names(&self) -> Vec<String> {
        let Some(idx) = self.roles.dealer_name else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .rows
            .iter()
            .map(|row| row[idx].display().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Distinct month labels present in the month column, in calendar order
    /// (January first). Empty when no month column was detected.
    pub fn month_labels(&self) -> Vec<String> {
        let Some(idx) = self.roles.month else {
            return Vec::new();
        };
        let present: HashSet<&str> = self
            .rows
            .iter()
            .filter_map(|row| dates::month_name(&row[idx]))
            .collect();
        dates::MONTH_NAMES
            .iter()
            .filter(|name| present.contains(**name))
            .map(|name| (*name).to_string())
            .collect()
    }
}

/// Build the ordered JSON object for one row, keyed by column name.
/// Relies on `serde_json`'s `preserve_order` feature so consumers can
/// derive the displayed column order from the first row's key set.
pub fn row_object(columns: &[String], row: &[CellValue]) -> serde_json::Map<String, Value> {
    columns
        .iter()
        .zip(row)
        .map(|(name, cell)| (name.clone(), cell.to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn display_formats_scalars() {
        assert_eq!(CellValue::Number(100.0).display(), "100");
        assert_eq!(CellValue::Number(1.5).display(), "1.5");
        assert_eq!(CellValue::Text("Acme".into()).display(), "Acme");
        assert_eq!(CellValue::Empty.display(), "");
        let d = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        assert_eq!(CellValue::Date(d).display(), "12/08/2025");
    }

    #[test]
    fn json_keeps_numbers_typed() {
        assert_eq!(CellValue::Number(100.0).to_json(), Value::from(100i64));
        assert_eq!(CellValue::Number(1.5).to_json(), Value::from(1.5));
        assert_eq!(CellValue::Empty.to_json(), Value::from(""));
    }

    #[test]
    fn detects_exact_and_fuzzy_headers() {
        let roles = ColumnRoles::detect(&cols(&["DEALER_NAME", "Dealer Code", "MONTH", "Amount"]));
        assert_eq!(roles.dealer_name, Some(0));
        assert_eq!(roles.dealer_code, Some(1));
        assert_eq!(roles.month, Some(2));

        let roles = ColumnRoles::detect(&cols(&["Party Name", "CODE", "SALE_DATE"]));
        assert_eq!(roles.dealer_name, Some(0));
        assert_eq!(roles.dealer_code, Some(1));
        assert_eq!(roles.month, Some(2));

        let roles = ColumnRoles::detect(&cols(&["sku", "qty"]));
        assert_eq!(roles, ColumnRoles::default());
    }

    #[test]
    fn exact_month_header_beats_date_fallback() {
        let roles = ColumnRoles::detect(&cols(&["Invoice Date", "Month"]));
        assert_eq!(roles.month, Some(1));
    }

    #[test]
    fn dropdown_sources_are_distinct_and_ordered() {
        let ds = Dataset::new(
            cols(&["dealer_name", "month"]),
            vec![
                vec![CellValue::Text("Beta".into()), CellValue::Text("Feb".into())],
                vec![CellValue::Text("Acme ".into()), CellValue::Text("Jan".into())],
                vec![CellValue::Text("Acme".into()), CellValue::Text("January".into())],
                vec![CellValue::Empty, CellValue::Empty],
            ],
        );
        assert_eq!(ds.dealer_names(), vec!["Acme", "Beta"]);
        assert_eq!(ds.month_labels(), vec!["January", "February"]);
    }

    #[test]
    fn row_object_preserves_column_order() {
        let columns = cols(&["b_col", "a_col"]);
        let row = vec![CellValue::Number(1.0), CellValue::Text("x".into())];
        let obj = row_object(&columns, &row);
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys, vec!["b_col", "a_col"]);
    }
}
