use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use packtrace_core::{audit_rows, ScanConfig, ScanMetadata};
use packtrace_ocr::{PipelineError, ScanOutcome, ScanPipeline, TextRecognizer};
use packtrace_sheets::{SheetsClient, SheetsError};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScanPipeline<Box<dyn TextRecognizer>>>,
    /// `None` when the audit trail is not configured; /api/log then returns
    /// 503 instead of silently dropping rows.
    pub sheets: Option<Arc<SheetsClient>>,
    pub config: Arc<ScanConfig>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/variants", get(variants))
        .route("/api/scan", post(scan))
        .route("/api/log", post(log_scan))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// The operator page: metadata form, photo upload, scan review.
async fn index() -> Html<&'static str> {
    Html(include_str!("form.html"))
}

#[derive(Serialize)]
struct VariantsResponse {
    variants: Vec<String>,
    source: &'static str,
}

/// Product list for the variant dropdown. Served from the products
/// worksheet when reachable, otherwise from the configured fallback list;
/// the page never renders an empty dropdown because the sheet is down.
async fn variants(State(state): State<AppState>) -> Json<VariantsResponse> {
    if let Some(sheets) = &state.sheets {
        match sheets.product_variants().await {
            Ok(products) if !products.is_empty() => {
                return Json(VariantsResponse { variants: products, source: "sheet" });
            }
            Ok(_) => warn!("products worksheet is empty, serving fallback list"),
            Err(e) => warn!("product list fetch failed, serving fallback list: {e}"),
        }
    }
    Json(VariantsResponse {
        variants: state.config.sheets.fallback_variants.clone(),
        source: "fallback",
    })
}

/// Run the pipeline on an uploaded photo. Expects a multipart form with the
/// photo in an `image` field.
async fn scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanOutcome>, ApiError> {
    let mut image = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("image") {
            image = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?
                .to_vec();
            break;
        }
    }
    if image.is_empty() {
        return Err(ApiError::bad_request("No image uploaded"));
    }

    info!(bytes = image.len(), "received scan upload");
    let outcome = state.pipeline.scan_bytes(&image).await?;
    info!(
        codes = outcome.result.codes.len(),
        date = %outcome.result.date,
        image = %outcome.image_sha256,
        "scan complete"
    );
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct LogRequest {
    metadata: ScanMetadata,
    codes: Vec<String>,
    #[serde(default)]
    date: String,
    image_sha256: String,
}

#[derive(Serialize)]
struct LogResponse {
    appended: u64,
}

/// Append the reviewed scan to the audit trail, one row per code.
async fn log_scan(
    State(state): State<AppState>,
    Json(req): Json<LogRequest>,
) -> Result<Json<LogResponse>, ApiError> {
    let sheets = state.sheets.as_ref().ok_or_else(|| ApiError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "Audit trail is not configured".to_string(),
    })?;
    if req.codes.is_empty() {
        return Err(ApiError::bad_request("No codes to log"));
    }

    let rows = audit_rows(&req.metadata, &req.codes, &req.date, Local::now(), &req.image_sha256);
    let appended = sheets.append_rows(&rows).await?;
    info!(appended, operator = %req.metadata.operator_code, "audit rows appended");
    Ok(Json(LogResponse { appended }))
}

// ── Error mapping ────────────────────────────────────────────────────────────

/// JSON error body with a status chosen by who is at fault: bad uploads are
/// 400, a failing recognizer or spreadsheet is a gateway problem, anything
/// else is 500.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Preprocess(_) => StatusCode::BAD_REQUEST,
            PipelineError::Ocr { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl From<SheetsError> for ApiError {
    fn from(err: SheetsError) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use packtrace_ocr::MockRecognizer;
    use std::io::Cursor;
    use tower::ServiceExt;

    fn app(recognized_text: &str) -> Router {
        let recognizer: Box<dyn TextRecognizer> = Box::new(MockRecognizer::new(recognized_text));
        let config = ScanConfig::default();
        let state = AppState {
            pipeline: Arc::new(ScanPipeline::new(recognizer, &config).unwrap()),
            sheets: None,
            config: Arc::new(config),
        };
        router(state, 20 * 1024 * 1024)
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |x, _| Luma([(x * 60) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    const BOUNDARY: &str = "packtrace-test-boundary";

    fn multipart_body(field_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"pack.png\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, field_name: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field_name, data)))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn index_serves_the_operator_form() {
        let resp = app("")
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<form"));
        assert!(html.contains("/api/scan"));
    }

    #[tokio::test]
    async fn variants_fall_back_without_sheets() {
        let resp = app("")
            .oneshot(Request::builder().uri("/api/variants").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["variants"][0], "Manual Entry");
    }

    #[tokio::test]
    async fn scan_returns_codes_date_and_image_hash() {
        let resp = app("ABC 123 XYZ 789\nMFD ON 21.08.25")
            .oneshot(multipart_request("/api/scan", "image", &tiny_png()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["result"]["codes"][0], "ABC 123 XYZ 789");
        assert_eq!(json["result"]["date"], "21/08/25");
        assert_eq!(json["image_sha256"].as_str().unwrap().len(), 64);
        assert_eq!(json["readings"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn scan_rejects_an_undecodable_upload() {
        let resp = app("irrelevant")
            .oneshot(multipart_request("/api/scan", "image", b"not an image"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("decode"));
    }

    #[tokio::test]
    async fn scan_without_an_image_field_is_a_bad_request() {
        let resp = app("")
            .oneshot(multipart_request("/api/scan", "attachment", &tiny_png()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "No image uploaded");
    }

    #[tokio::test]
    async fn log_without_sheets_is_service_unavailable() {
        let body = serde_json::json!({
            "metadata": {
                "operator_name": "A. Kumar",
                "operator_code": "OP17",
                "issued_to_name": "Central Depot",
                "issued_to_code": "FWP03",
                "product_variant": "Kings Filter",
                "sku": "KF-20"
            },
            "codes": ["ABC 123 XYZ 789"],
            "date": "21/08/25",
            "image_sha256": "deadbeef"
        });
        let resp = app("")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/log")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
