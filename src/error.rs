use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Upload-time failures raised while turning raw bytes into a dataset.
///
/// Every variant maps to a stable taxonomy code surfaced to the client in
/// the `error` field of a `{success: false}` response.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The byte stream could not be decoded as an XLSX container, or the
    /// request carried no usable file at all.
    #[error("could not read workbook: {0}")]
    UnreadableFile(String),

    /// The workbook decoded fine but holds no data rows below the header.
    #[error("sheet has no data rows")]
    EmptySheet,

    /// The header row is unusable (duplicate or unnamed columns).
    #[error("malformed sheet: {0}")]
    MalformedSheet(String),
}

impl SheetError {
    /// Stable code for the JSON error contract.
    pub fn code(&self) -> &'static str {
        match self {
            SheetError::UnreadableFile(_) => "UnreadableFile",
            SheetError::EmptySheet => "EmptySheet",
            SheetError::MalformedSheet(_) => "MalformedSheet",
        }
    }
}

/// Export-time failures from the Excel or PDF renderers.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("excel render failed: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf render failed: {0}")]
    Pdf(String),
}

/// Everything a gateway handler can fail with.
///
/// Converted into the structured `{success: false, error: <code>}` body at
/// the boundary; no error escapes as a panic or a bare string.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error("unknown or expired upload_id")]
    SessionNotFound,

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Sheet(e) => e.code(),
            ApiError::SessionNotFound => "SessionNotFound",
            ApiError::Render(_) => "RenderFailure",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Sheet(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("request failed ({}): {}", self.code(), self);
        let body = serde_json::json!({
            "success": false,
            "error": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_error_codes_are_stable() {
        assert_eq!(SheetError::UnreadableFile("x".into()).code(), "UnreadableFile");
        assert_eq!(SheetError::EmptySheet.code(), "EmptySheet");
        assert_eq!(SheetError::MalformedSheet("dup".into()).code(), "MalformedSheet");
    }

    #[test]
    fn api_error_wraps_stage_codes() {
        let err: ApiError = SheetError::EmptySheet.into();
        assert_eq!(err.code(), "EmptySheet");
        assert_eq!(ApiError::SessionNotFound.code(), "SessionNotFound");
        assert_eq!(ApiError::Render(RenderError::Pdf("boom".into())).code(), "RenderFailure");
    }
}
