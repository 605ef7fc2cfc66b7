//! End-to-end tests driving the router in-process: upload a sheet, query
//! the filtered table, and download both export formats.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::Value;
use tower::ServiceExt;

use dealer_dashboard::app::{AppState, router};
use dealer_dashboard::session::SessionStore;

const BOUNDARY: &str = "dealer-dashboard-test-boundary";

fn test_app() -> Router {
    router(Arc::new(AppState {
        store: SessionStore::new(8),
    }))
}

// The sample sheet: columns [dealer_code, dealer_name, month, amount] with
// two Acme (D1) rows and one Beta (D2) row.
fn sample_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let headers = ["dealer_code", "dealer_name", "month", "amount"];
    for (c, h) in headers.iter().enumerate() {
        worksheet.write_string(0, c as u16, *h).unwrap();
    }
    let rows = [
        ("D1", "Acme", "Jan", 100.0),
        ("D1", "Acme", "Feb", 150.0),
        ("D2", "Beta", "Jan", 200.0),
    ];
    for (r, (code, name, month, amount)) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        worksheet.write_string(r, 0, *code).unwrap();
        worksheet.write_string(r, 1, *name).unwrap();
        worksheet.write_string(r, 2, *month).unwrap();
        worksheet.write_number(r, 3, *amount).unwrap();
    }
    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().unwrap()
}

fn multipart_body(file_bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"dealers.xlsx\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(file_bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file_bytes)))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn upload_sample(app: &Router) -> String {
    let response = app.clone().oneshot(upload_request(&sample_xlsx())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], Value::Bool(true));
    json["upload_id"].as_str().unwrap().to_string()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn upload_returns_dropdown_data() {
    let app = test_app();
    let response = app.clone().oneshot(upload_request(&sample_xlsx())).await.unwrap();
    let json = body_json(response).await;

    assert_eq!(json["success"], Value::Bool(true));
    assert_eq!(json["dealers"], serde_json::json!(["Acme", "Beta"]));
    assert_eq!(json["months"], serde_json::json!(["January", "February"]));
    assert_eq!(json["dealer_name_col"], "dealer_name");
    assert_eq!(json["dealer_code_col"], "dealer_code");
    assert_eq!(json["month_col"], "month");
    assert_eq!(json["upload_id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn dealer_data_applies_filters() {
    let app = test_app();
    let id = upload_sample(&app).await;

    // dealer=D1, month=ALL: the two Acme rows
    let json = body_json(get(&app, &format!("/dealer-data?upload_id={id}&dealer=D1&month=ALL")).await).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    assert_eq!(json["dealer_code"], "D1");
    assert_eq!(json["month_label"], "All");
    for row in json["rows"].as_array().unwrap() {
        assert_eq!(row["dealer_code"], "D1");
        assert_eq!(row["dealer_name"], "Acme");
    }

    // dealer=D2, month=Jan: the single Beta row
    let json = body_json(get(&app, &format!("/dealer-data?upload_id={id}&dealer=D2&month=Jan")).await).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["rows"][0]["dealer_name"], "Beta");
    assert_eq!(json["rows"][0]["amount"], 200);
    assert_eq!(json["month_label"], "Jan");
}

#[tokio::test]
async fn unrestricted_query_returns_all_rows_in_order() {
    let app = test_app();
    let id = upload_sample(&app).await;

    let json = body_json(get(&app, &format!("/dealer-data?upload_id={id}&month=ALL")).await).await;
    assert_eq!(json["total"], 3);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows[0]["month"], "Jan");
    assert_eq!(rows[1]["month"], "Feb");
    assert_eq!(rows[2]["dealer_code"], "D2");
    // spans two dealers: no representative code
    assert_eq!(json["dealer_code"], Value::Null);

    // row objects carry the dataset's column order
    let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["dealer_code", "dealer_name", "month", "amount"]);
}

#[tokio::test]
async fn repeated_queries_are_byte_identical() {
    let app = test_app();
    let id = upload_sample(&app).await;
    let uri = format!("/dealer-data?upload_id={id}&dealer=Acme&month=January");

    let first = body_bytes(get(&app, &uri).await).await;
    let second = body_bytes(get(&app, &uri).await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_upload_id_is_session_not_found() {
    let app = test_app();

    for uri in [
        "/dealer-data?upload_id=deadbeef",
        "/export/excel?upload_id=deadbeef",
        "/export/pdf?upload_id=deadbeef",
        "/dealer-data",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["success"], Value::Bool(false));
        assert_eq!(json["error"], "SessionNotFound");
    }
}

#[tokio::test]
async fn garbage_upload_is_rejected_without_a_session() {
    let app = test_app();
    let response = app.clone().oneshot(upload_request(b"not a spreadsheet")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], Value::Bool(false));
    assert_eq!(json["error"], "UnreadableFile");
}

#[tokio::test]
async fn excel_export_matches_the_table_view() {
    let app = test_app();
    let id = upload_sample(&app).await;

    let response = get(&app, &format!("/export/excel?upload_id={id}&dealer=D1&month=ALL")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"dealer_data_D1.xlsx\""
    );
    let bytes = body_bytes(response).await;
    // XLSX is a zip container
    assert_eq!(&bytes[..2], b"PK");

    // re-parse the download and compare with the filtered table
    let dataset = dealer_dashboard::loader::parse_xlsx(&bytes).unwrap();
    assert_eq!(dataset.columns, ["dealer_code", "dealer_name", "month", "amount"]);
    assert_eq!(dataset.rows.len(), 2);
    assert_eq!(dataset.rows[0][3], dealer_dashboard::CellValue::Number(100.0));
    assert_eq!(dataset.rows[1][3], dealer_dashboard::CellValue::Number(150.0));
}

#[tokio::test]
async fn pdf_export_is_a_valid_document() {
    let app = test_app();
    let id = upload_sample(&app).await;

    let response = get(&app, &format!("/export/pdf?upload_id={id}&dealer=D1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));

    // empty filtered view still downloads a valid document
    let response = get(&app, &format!("/export/pdf?upload_id={id}&dealer=Nobody&month=March")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}
