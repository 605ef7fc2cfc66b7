use std::collections::HashSet;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::dataset::{CellValue, Dataset};
use crate::dates;
use crate::error::SheetError;

/// Parse uploaded XLSX bytes into a [`Dataset`].
///
/// Reads the first worksheet only. The first row supplies the column names
/// (trimmed; trailing unnamed columns are dropped); every following row is
/// coerced to the header width, padding short rows with empty cells and
/// truncating long ones. Pure transformation: on any failure nothing is
/// published anywhere.
///
/// # Errors
/// * `UnreadableFile` - the bytes are not a decodable XLSX container
/// * `EmptySheet` - the sheet has no data rows below the header
/// * `MalformedSheet` - duplicate or unnamed columns in the header row
pub fn parse_xlsx(data: &[u8]) -> Result<Dataset, SheetError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(data)).map_err(|e| SheetError::UnreadableFile(e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(SheetError::UnreadableFile(e.to_string())),
        None => return Err(SheetError::UnreadableFile("workbook has no sheets".to_string())),
    };

    let mut rows_iter = range.rows();
    let header_row = rows_iter.next().ok_or(SheetError::EmptySheet)?;

    let mut columns: Vec<String> = header_row.iter().map(header_text).collect();
    while columns.last().is_some_and(|c| c.is_empty()) {
        columns.pop();
    }
    if columns.is_empty() {
        return Err(SheetError::MalformedSheet("header row has no column names".to_string()));
    }

    let mut seen = HashSet::new();
    for name in &columns {
        if name.is_empty() {
            return Err(SheetError::MalformedSheet("unnamed column in header row".to_string()));
        }
        if !seen.insert(name.as_str()) {
            return Err(SheetError::MalformedSheet(format!("duplicate column \"{name}\"")));
        }
    }

    let width = columns.len();
    let mut rows = Vec::new();
    for raw in rows_iter {
        let mut row: Vec<CellValue> = raw.iter().take(width).map(to_cell).collect();
        row.resize(width, CellValue::Empty);
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(SheetError::EmptySheet);
    }

    Ok(Dataset::new(columns, rows))
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

// Source type is preserved; date-like values (Excel datetimes, YYYYMMDD
// numbers, common D/M/Y strings) are promoted to dates so month filtering
// and display work the same no matter how the sheet encoded them.
fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => match dates::parse_date_number(*i as f64) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Number(*i as f64),
        },
        Data::Float(f) => match dates::parse_date_number(*f) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Number(*f),
        },
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else if let Some(d) = dates::parse_date_text(trimmed) {
                CellValue::Date(d)
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(ndt.date()),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => match dates::parse_date_text(s) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Text(s.trim().to_string()),
        },
    }
}
