use crate::dataset::{CellValue, ColumnRoles};
use crate::dates;
use crate::session::Session;

/// Sentinel month key meaning "no month restriction".
pub const MONTH_ALL: &str = "ALL";

/// Label reported when no month restriction is active.
pub const MONTH_LABEL_ALL: &str = "All";

/// The filtered view of one session, shared by the table endpoint and both
/// export renderers. Borrows the session's rows; never stored.
#[derive(Debug)]
pub struct FilteredResult<'a> {
    /// Active column list, identical to the dataset's column order.
    pub columns: &'a [String],

    /// Column roles, used by the PDF renderer's header transform.
    pub roles: ColumnRoles,

    /// Matching rows in original sheet order.
    pub rows: Vec<&'a [CellValue]>,

    /// Count of matching rows; always equals `rows.len()`.
    pub total: usize,

    /// The dealer restriction that was applied, trimmed, if any.
    pub dealer: Option<String>,

    /// Dealer code resolved from the first matching row, when the result
    /// does not span multiple dealers.
    pub dealer_code: Option<String>,

    /// Dealer name resolved the same way, for the PDF header.
    pub dealer_name: Option<String>,

    /// The supplied month key, or "All" when unrestricted.
    pub month_label: String,
}

// Equality rule for dealer and month keys: trimmed, ASCII case-insensitive.
// Fixed here so the table view and both exports can never disagree.
fn key_matches(cell: &CellValue, key: &str) -> bool {
    cell.display().trim().eq_ignore_ascii_case(key)
}

/// Apply dealer/month criteria to a session's rows.
///
/// A dealer key matches a row when it equals either the dealer-name or the
/// dealer-code cell; an absent or empty key leaves all dealers in. A month
/// key of `"ALL"` (or absent) applies no month restriction; otherwise the
/// key is resolved to a canonical month name and compared against each
/// row's month cell. The filter is stable: surviving rows keep their
/// original order. An empty match set is a normal result, never an error.
pub fn filter_rows<'a>(
    session: &'a Session,
    dealer: Option<&str>,
    month: Option<&str>,
) -> FilteredResult<'a> {
    let dataset = &session.dataset;
    let roles = dataset.roles;

    let dealer_key = dealer.map(str::trim).filter(|d| !d.is_empty());
    let mut rows: Vec<&[CellValue]> = dataset.rows.iter().map(Vec::as_slice).collect();

    if let Some(key) = dealer_key {
        rows.retain(|row| {
            let name_hit = roles.dealer_name.is_some_and(|i| key_matches(&row[i], key));
            let code_hit = roles.dealer_code.is_some_and(|i| key_matches(&row[i], key));
            name_hit || code_hit
        });
    }

    let month_key = month
        .map(str::trim)
        .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case(MONTH_ALL));
    let month_label = month_key.map_or_else(|| MONTH_LABEL_ALL.to_string(), str::to_string);

    if let (Some(key), Some(idx)) = (month_key, roles.month) {
        let wanted = dates::resolve_month_name(key);
        rows.retain(|row| match (dates::month_name(&row[idx]), wanted) {
            (Some(actual), Some(canonical)) => actual == canonical,
            (Some(actual), None) => actual.eq_ignore_ascii_case(key),
            (None, _) => false,
        });
    }

    // Identifying values come from the first row surviving both
    // restrictions, and only when the selection does not span several
    // dealers.
    let resolved = dealer_key.is_some() || spans_single_dealer(&rows, roles);
    let (dealer_code, dealer_name) = if resolved {
        let first = rows.first();
        (
            first.and_then(|r| roles.dealer_code.map(|i| r[i].display())),
            first.and_then(|r| roles.dealer_name.map(|i| r[i].display())),
        )
    } else {
        (None, None)
    };

    let total = rows.len();
    FilteredResult {
        columns: &dataset.columns,
        roles,
        rows,
        total,
        dealer: dealer_key.map(str::to_string),
        dealer_code,
        dealer_name,
        month_label,
    }
}

// True when every row shows the same dealer (or there is no way to tell
// dealers apart, in which case the single representative is still honest).
fn spans_single_dealer(rows: &[&[CellValue]], roles: ColumnRoles) -> bool {
    let Some(idx) = roles.dealer_name.or(roles.dealer_code) else {
        return false;
    };
    let mut values = rows
        .iter()
        .map(|row| row[idx].display().trim().to_lowercase());
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => false,
    }
}
