/*!
# Dealer Report Dashboard

A browser-based dealer report dashboard, built in Rust.

## Overview

Users upload a spreadsheet of dealer records, filter it by dealer and
month, view the filtered rows in a table, and export the same filtered
view as an Excel workbook or a paginated PDF report. Each upload becomes
an in-memory session addressed by an opaque id; every subsequent query or
export re-applies the dealer/month criteria to that session's immutable
dataset, so the table view and both exports can never disagree.

## Architecture

- **Sheet Parser** (`loader`) - turns uploaded XLSX bytes into a normalized
  dataset: ordered column list, typed rows coerced to the header width,
  and detected dealer/month column roles.
- **Session Store** (`session`) - process-wide map of parsed uploads keyed
  by random ids, capped with oldest-first eviction.
- **Filter Engine** (`filter`) - applies dealer/month equality criteria and
  derives the summary fields (total, resolved dealer code, month label).
- **Export Renderer** (`downloader`) - renders a filtered view as an XLSX
  workbook or a paginated PDF with the identifying columns promoted to the
  document header.
- **Request Gateway** (`app`) - axum router exposing upload, query and
  download endpoints; all failures surface as structured
  `{success: false, error}` responses.

## Modules

- **dataset**: cell values, the dataset model and column-role detection
- **dates**: date and month-name coercion shared by parser and filter
- **loader**: XLSX import
- **session**: upload sessions and the capped store
- **filter**: dealer/month filtering
- **downloader**: Excel and PDF export
- **error**: the error taxonomy and its JSON boundary mapping
- **app**: routing and handlers

## REST API Endpoints

- `POST /upload` - multipart spreadsheet upload, returns the upload id and
  dropdown data
- `GET /dealer-data?upload_id&dealer&month` - filtered rows as JSON
- `GET /export/excel?upload_id&dealer&month` - filtered view as XLSX
- `GET /export/pdf?upload_id&dealer&month` - filtered view as PDF
*/

pub mod app;
pub mod dataset;
pub mod dates;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod loader;
pub mod session;

pub use dataset::{CellValue, ColumnRoles, Dataset};
pub use error::{ApiError, RenderError, SheetError};
pub use filter::{FilteredResult, filter_rows};
pub use session::{Session, SessionStore};
