//! HTTP presentation shell.
//!
//! Upload a document, read back its extracted text, ask questions against
//! that text and browse the upload history.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::{Result, RodeoError};
use crate::ingest::{DocumentStatus, ExtractedDocument, FileType, IngestReceipt, UploadedDocument};
use crate::qa::Answer;
use crate::registry::DEFAULT_HISTORY_LIMIT;

/// Upper bound on `limit` for the history listing
const MAX_HISTORY_LIMIT: usize = 100;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const EMPTY_EXTRACTION_WARNING: &str = "No text could be extracted from this document.";

/// Error wrapper that renders as a JSON body with a status per failure kind
///
/// `upload` is set when the document was staged before the failure, so the
/// caller can retry extraction against the staged reference.
pub struct ApiError {
    error: RodeoError,
    upload: Option<IngestReceipt>,
}

impl From<RodeoError> for ApiError {
    fn from(error: RodeoError) -> Self {
        ApiError { error, upload: None }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    transient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload: Option<&'a IngestReceipt>,
}

impl ApiError {
    fn after_upload(error: RodeoError, receipt: IngestReceipt) -> Self {
        ApiError {
            error,
            upload: Some(receipt),
        }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            RodeoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RodeoError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_transient() => StatusCode::GATEWAY_TIMEOUT,
            RodeoError::StorageWrite(_) | RodeoError::Extraction { .. } | RodeoError::Completion { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed ({}): {}", status, self.error);
        } else {
            log::warn!("Request rejected ({}): {}", status, self.error);
        }

        let body = ErrorBody {
            error: self.error.kind(),
            message: self.error.user_message(),
            transient: self.error.is_transient(),
            upload: self.upload.as_ref(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extracted text of a staged document
#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub staged_reference: String,
    pub text: String,
    pub char_count: usize,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExtractionResponse {
    fn new(extracted: ExtractedDocument, preview_chars: usize) -> Self {
        let warning = extracted
            .is_empty()
            .then(|| EMPTY_EXTRACTION_WARNING.to_string());
        Self {
            char_count: extracted.char_count(),
            preview: extracted.preview(preview_chars).to_string(),
            staged_reference: extracted.source,
            text: extracted.text,
            warning,
        }
    }
}

/// Response to an upload: the stored document plus its extracted text
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub receipt: IngestReceipt,
    #[serde(flatten)]
    pub extraction: ExtractionResponse,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    #[serde(default)]
    pub document_text: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Build the router over shared application state
pub fn create_router(app: Arc<App>, max_upload_bytes: u64, allowed_origins: &[String]) -> Router {
    // No origins configured means local use: allow any
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/documents", post(handle_upload).get(handle_history))
        .route("/documents/:staged_reference", delete(handle_remove))
        .route("/documents/:staged_reference/extract", post(handle_extract))
        .route("/answer", post(handle_answer))
        .route("/health", get(handle_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app)
}

/// Bind to `127.0.0.1:port` and serve until the process stops
pub async fn run(app: Arc<App>, port: u16, max_upload_bytes: u64, allowed_origins: &[String]) -> Result<()> {
    let router = create_router(app, max_upload_bytes, allowed_origins);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        RodeoError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to bind to {}: {}. Set http_server.port in config.toml to use another port.",
                addr, e
            ),
        ))
    })?;

    log::info!("Document Rodeo listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| RodeoError::Io(std::io::Error::other(format!("HTTP server error: {}", e))))?;

    Ok(())
}

async fn handle_upload(State(app): State<Arc<App>>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(invalid_upload)?;
        upload = Some((name, bytes.to_vec()));
        break;
    }

    let (name, bytes) = upload.ok_or_else(|| {
        RodeoError::InvalidInput("Choose a file to upload (multipart field \"file\").".to_string())
    })?;

    let receipt = app.pipeline.ingest(&bytes, &name, bytes.len() as u64).await?;

    let extracted = match app
        .pipeline
        .extract(&receipt.document.staged_reference, receipt.document.file_type)
        .await
    {
        Ok(extracted) => extracted,
        Err(e) => return Err(ApiError::after_upload(e, receipt)),
    };

    Ok(Json(UploadResponse {
        receipt,
        extraction: ExtractionResponse::new(extracted, app.preview_chars),
    }))
}

/// Re-run extraction for a document that is already staged
async fn handle_extract(
    State(app): State<Arc<App>>,
    Path(staged_reference): Path<String>,
) -> ApiResult<Json<ExtractionResponse>> {
    if !app.pipeline.store().exists(&staged_reference).await? {
        return Err(RodeoError::NotFound(staged_reference).into());
    }

    let recorded = match &app.registry {
        Some(registry) => registry.get(&staged_reference).await?,
        None => None,
    };
    // Staged references end with the sanitized original name
    let file_type = recorded
        .map(|doc| doc.file_type)
        .unwrap_or_else(|| FileType::from_filename(&staged_reference));

    let extracted = app.pipeline.extract(&staged_reference, file_type).await?;
    Ok(Json(ExtractionResponse::new(extracted, app.preview_chars)))
}

async fn handle_answer(State(app): State<Arc<App>>, Json(request): Json<AnswerRequest>) -> ApiResult<Json<Answer>> {
    let answer = app
        .assembler
        .answer(&request.question, &request.document_text)
        .await?;
    Ok(Json(answer))
}

async fn handle_history(
    State(app): State<Arc<App>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<UploadedDocument>>> {
    let registry = app
        .registry
        .as_ref()
        .ok_or_else(|| RodeoError::NotFound("upload history is disabled".to_string()))?;

    let status = match query.status.as_deref() {
        Some(s) => s.parse::<DocumentStatus>()?,
        None => DocumentStatus::Active,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    Ok(Json(registry.list_recent(status, limit).await?))
}

async fn handle_remove(
    State(app): State<Arc<App>>,
    Path(staged_reference): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let registry = app
        .registry
        .as_ref()
        .ok_or_else(|| RodeoError::NotFound("upload history is disabled".to_string()))?;

    if !registry
        .set_status(&staged_reference, DocumentStatus::Removed)
        .await?
    {
        return Err(RodeoError::NotFound(staged_reference).into());
    }

    log::info!("Marked {} as removed", staged_reference);
    Ok(Json(json!({
        "staged_reference": staged_reference,
        "status": DocumentStatus::Removed.as_str(),
    })))
}

async fn handle_health(State(app): State<Arc<App>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "extractor": app.pipeline.extractor_name(),
        "model": app.assembler.model(),
        "history": app.registry.is_some(),
    }))
}

fn invalid_upload(err: axum::extract::multipart::MultipartError) -> RodeoError {
    RodeoError::InvalidInput(format!("Invalid upload: {}", err.body_text()))
}
