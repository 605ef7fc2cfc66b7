use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::dataset::row_object;
use crate::downloader;
use crate::error::{ApiError, SheetError};
use crate::filter::{self, FilteredResult};
use crate::loader;
use crate::session::{Session, SessionStore};

// Uploads above this size are rejected outright.
const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PDF_MIME: &str = "application/pdf";

/// Shared state injected into every handler: just the session store.
pub struct AppState {
    pub store: SessionStore,
}

#[derive(Debug, Deserialize)]
pub struct FilterParams {
    pub upload_id: Option<String>,
    pub dealer: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub upload_id: String,
    pub dealer_name_col: Option<String>,
    pub dealer_code_col: Option<String>,
    pub month_col: Option<String>,
    pub dealers: Vec<String>,
    pub months: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DealerDataResponse {
    pub success: bool,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub total: usize,
    pub dealer_code: Option<String>,
    pub month_label: String,
}

/// Build the application router.
///
/// Exposed separately from [`run`] so tests can drive the full HTTP
/// surface in-process with `tower::ServiceExt::oneshot`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/upload", post(upload))
        .route("/dealer-data", get(dealer_data))
        .route("/export/excel", get(export_excel))
        .route("/export/pdf", get(export_pdf))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server on `addr` with a session store capped at
/// `max_sessions` uploads.
pub async fn run(addr: SocketAddr, max_sessions: usize) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        store: SessionStore::new(max_sessions),
    });
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// `POST /upload` - parse a multipart spreadsheet into a new session.
///
/// Expects the file under the `file` field. On success returns the upload
/// id plus everything the dashboard needs to populate its dropdowns; any
/// parse failure surfaces as `{success: false, error}` and publishes no
/// session.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SheetError::UnreadableFile(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| SheetError::UnreadableFile(format!("failed to read upload: {e}")))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let data = file_data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| SheetError::UnreadableFile("no file field in upload".to_string()))?;

    let dataset = loader::parse_xlsx(&data)?;
    let session = state.store.put(dataset);
    log::info!(
        "upload {}: {} rows, {} columns, {} dealers",
        session.upload_id,
        session.dataset.rows.len(),
        session.dataset.columns.len(),
        session.dealers.len()
    );

    let column_name = |idx: Option<usize>| idx.map(|i| session.dataset.columns[i].clone());
    Ok(Json(UploadResponse {
        success: true,
        message: "Sheet loaded successfully".to_string(),
        upload_id: session.upload_id.clone(),
        dealer_name_col: column_name(session.dataset.roles.dealer_name),
        dealer_code_col: column_name(session.dataset.roles.dealer_code),
        month_col: column_name(session.dataset.roles.month),
        dealers: session.dealers.clone(),
        months: session.months.clone(),
    }))
}

/// `GET /dealer-data` - the filtered table view.
///
/// `rows` objects carry the dataset's columns in original order; consumers
/// derive the displayed columns from the first row's key set.
async fn dealer_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Json<DealerDataResponse>, ApiError> {
    let session = lookup(&state, &params)?;
    let result = apply_filters(&session, &params);
    let rows = result
        .rows
        .iter()
        .map(|row| row_object(result.columns, row))
        .collect();
    Ok(Json(DealerDataResponse {
        success: true,
        rows,
        total: result.total,
        dealer_code: result.dealer_code.clone(),
        month_label: result.month_label.clone(),
    }))
}

/// `GET /export/excel` - the same filtered view as an XLSX download.
async fn export_excel(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &params)?;
    let result = apply_filters(&session, &params);
    let bytes = downloader::to_xlsx(&result)?;
    log::info!("excel export for upload {}: {} rows", session.upload_id, result.total);
    Ok(attachment(bytes, XLSX_MIME, &download_name(&params, "xlsx")))
}

/// `GET /export/pdf` - the same filtered view as a paginated PDF report.
async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    let session = lookup(&state, &params)?;
    let result = apply_filters(&session, &params);
    let bytes = downloader::to_pdf(&result)?;
    log::info!("pdf export for upload {}: {} rows", session.upload_id, result.total);
    Ok(attachment(bytes, PDF_MIME, &download_name(&params, "pdf")))
}

fn lookup(state: &AppState, params: &FilterParams) -> Result<Arc<Session>, ApiError> {
    state
        .store
        .get(params.upload_id.as_deref().unwrap_or_default())
        .ok_or(ApiError::SessionNotFound)
}

fn apply_filters<'a>(session: &'a Session, params: &FilterParams) -> FilteredResult<'a> {
    filter::filter_rows(session, params.dealer.as_deref(), params.month.as_deref())
}

// dealer_data_<dealer>.<ext>, spaces folded to underscores and anything
// header-unsafe dropped.
fn download_name(params: &FilterParams, ext: &str) -> String {
    let mut tag: String = params
        .dealer
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("all")
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    if tag.is_empty() {
        tag = "all".to_string();
    }
    format!("dealer_data_{tag}.{ext}")
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(dealer: Option<&str>) -> FilterParams {
        FilterParams {
            upload_id: Some("x".to_string()),
            dealer: dealer.map(str::to_string),
            month: None,
        }
    }

    #[test]
    fn download_names_are_header_safe() {
        assert_eq!(download_name(&params(None), "xlsx"), "dealer_data_all.xlsx");
        assert_eq!(
            download_name(&params(Some("Acme Motors")), "pdf"),
            "dealer_data_Acme_Motors.pdf"
        );
        assert_eq!(
            download_name(&params(Some("we\"ird/name")), "pdf"),
            "dealer_data_weirdname.pdf"
        );
        assert_eq!(download_name(&params(Some("\"//")), "pdf"), "dealer_data_all.pdf");
    }
}
