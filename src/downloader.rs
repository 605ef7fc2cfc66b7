use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dataset::CellValue;
use crate::error::RenderError;
use crate::filter::FilteredResult;

/// Render a filtered view as an XLSX workbook.
///
/// One sheet named "DealerData": header row from the active column list,
/// then one row per matching row. Whatever columns the upload had are
/// written as-is; numbers keep their native numeric type so the exported
/// cells stay typed, everything else is written as its display string and
/// empty cells are left blank.
pub fn to_xlsx(result: &FilteredResult) -> Result<Vec<u8>, RenderError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("DealerData")?;

    for (c, name) in result.columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, name.as_str())?;
    }
    for (r, row) in result.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                CellValue::Number(n) => {
                    worksheet.write_number((r + 1) as u32, c as u16, *n)?;
                }
                CellValue::Empty => {}
                other => {
                    worksheet.write_string((r + 1) as u32, c as u16, other.display())?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

// Landscape A4 geometry, in millimetres.
const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;
const MARGIN: f32 = 12.0;
const ROW_H: f32 = 6.0;
const TITLE_SIZE: f32 = 14.0;
const META_SIZE: f32 = 10.0;
const HEAD_SIZE: f32 = 9.0;
const BODY_SIZE: f32 = 8.0;
const FOOTER: &str = "Dealer Report Dashboard";

// Body columns for the PDF grid: everything except the identifying
// columns, which are promoted to the header area instead.
fn body_columns(result: &FilteredResult) -> Vec<usize> {
    (0..result.columns.len())
        .filter(|i| Some(*i) != result.roles.dealer_name && Some(*i) != result.roles.dealer_code)
        .collect()
}

/// Render a filtered view as a paginated PDF report.
///
/// The dealer name/code columns are dropped from the body grid and
/// promoted to the document header, together with the month label and the
/// total item count; the first matching row supplies the representative
/// values. Remaining columns split the usable width evenly, overlong cells
/// are clipped, and the column header row repeats on every page. An empty
/// result still yields a valid document with a placeholder body.
pub fn to_pdf(result: &FilteredResult) -> Result<Vec<u8>, RenderError> {
    let title = format!(
        "Dealer Report - {}",
        result.dealer.as_deref().unwrap_or("All Dealers")
    );
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "report");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let body_cols = body_columns(result);
    let col_w = (PAGE_W - 2.0 * MARGIN) / body_cols.len().max(1) as f32;
    // Rough Helvetica fit: ~1.5mm per character at body size.
    let char_budget = ((col_w - 2.0) / 1.5).max(3.0) as usize;

    let mut current = doc.get_page(page).get_layer(layer);
    draw_footer(&current, &font);

    let mut y = PAGE_H - MARGIN - 6.0;
    current.use_text(title.clone(), TITLE_SIZE, Mm(MARGIN), Mm(y), &bold);
    y -= 8.0;
    let meta = format!(
        "Dealer Code: {}    Dealer Name: {}    Month: {}    Items: {}",
        result.dealer_code.as_deref().unwrap_or("-"),
        result.dealer_name.as_deref().unwrap_or("-"),
        result.month_label,
        result.total,
    );
    current.use_text(meta, META_SIZE, Mm(MARGIN), Mm(y), &font);
    y -= 10.0;

    draw_header_row(&current, &bold, result, &body_cols, col_w, char_budget, y);
    y -= ROW_H;

    if result.rows.is_empty() {
        current.use_text("No matching rows", BODY_SIZE, Mm(MARGIN), Mm(y), &font);
    }

    for row in &result.rows {
        if y < MARGIN + ROW_H {
            let (next_page, next_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "report");
            current = doc.get_page(next_page).get_layer(next_layer);
            draw_footer(&current, &font);
            y = PAGE_H - MARGIN - 6.0;
            draw_header_row(&current, &bold, result, &body_cols, col_w, char_budget, y);
            y -= ROW_H;
        }
        for (slot, &ci) in body_cols.iter().enumerate() {
            let text = clip(&row[ci].display(), char_budget);
            if !text.is_empty() {
                current.use_text(text, BODY_SIZE, Mm(MARGIN + slot as f32 * col_w), Mm(y), &font);
            }
        }
        y -= ROW_H;
    }

    doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
}

fn draw_header_row(
    layer: &PdfLayerReference,
    bold: &IndirectFontRef,
    result: &FilteredResult,
    body_cols: &[usize],
    col_w: f32,
    char_budget: usize,
    y: f32,
) {
    for (slot, &ci) in body_cols.iter().enumerate() {
        layer.use_text(
            clip(&result.columns[ci], char_budget),
            HEAD_SIZE,
            Mm(MARGIN + slot as f32 * col_w),
            Mm(y),
            bold,
        );
    }
    // rule under the header labels
    layer.set_outline_thickness(0.3);
    layer.set_outline_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y - 1.5)), false),
            (Point::new(Mm(PAGE_W - MARGIN), Mm(y - 1.5)), false),
        ],
        is_closed: false,
    });
}

// Light gray footer centered at the bottom of every page.
fn draw_footer(layer: &PdfLayerReference, font: &IndirectFontRef) {
    layer.set_fill_color(Color::Rgb(Rgb::new(0.55, 0.55, 0.55, None)));
    let x = PAGE_W / 2.0 - FOOTER.len() as f32 * 0.8;
    layer.use_text(FOOTER, HEAD_SIZE, Mm(x), Mm(4.0), font);
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
}

fn clip(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(budget.saturating_sub(2)).collect();
        clipped.push_str("..");
        clipped
    }
}
