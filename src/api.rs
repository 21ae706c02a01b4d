//! HTTP surface for Docsum.
//!
//! - `POST /sets` – Multipart upload (`set_name` plus one or more `documents` files) that
//!   creates a new document set owned by the caller.
//! - `GET /sets` – List the caller's document sets.
//! - `POST /summary` – Summarize the titles of one of the caller's sets
//!   (`{"document_set": <id>}`).
//! - `GET /metrics` – Upload and summary counters.
//! - `GET /commands` – Machine-readable route catalog.
//! - `GET /health` – Liveness probe.
//!
//! Every route except `/commands`, `/health`, and `/metrics` requires
//! `Authorization: Bearer <token>`.

use crate::auth::CurrentUser;
use crate::processing::{
    DocumentApi, FieldErrors, NON_FIELD_ERRORS, Notice, SelectionError, SummarizeError,
    UploadError, UploadSubmission, UploadedFile,
};
use crate::store::{DocumentSet, StoreError};
use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Notice attached to a rejected upload.
pub const UPLOAD_FAILED: &str = "Upload failed. Please correct the errors.";

/// Request body cap shared by the router layer and the upload handler's error text.
#[derive(Debug, Clone, Copy)]
struct UploadLimit(usize);

/// Build the HTTP router. `upload_max_bytes` caps request bodies.
pub fn create_router<S>(service: Arc<S>, upload_max_bytes: usize) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/sets", get(list_sets::<S>).post(upload_documents::<S>))
        .route("/summary", post(summarize::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(upload_max_bytes))
        .layer(Extension(UploadLimit(upload_max_bytes)))
        .with_state(service)
}

/// Response body for `POST /sets`.
#[derive(Serialize)]
struct UploadResponse {
    document_set: DocumentSet,
    messages: Vec<Notice>,
}

/// Create a document set from a multipart upload.
async fn upload_documents<S>(
    State(service): State<Arc<S>>,
    Extension(limit): Extension<UploadLimit>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError>
where
    S: DocumentApi + 'static,
{
    let multipart = multipart.map_err(|rejection| {
        AppError::rejected_upload(rejection.status(), rejection.body_text())
    })?;
    let submission = read_submission(multipart, limit).await?;

    let outcome = service.upload_documents(&user, submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_set: outcome.document_set,
            messages: outcome.notices,
        }),
    ))
}

/// Collect `set_name` and `documents` parts; other fields are ignored.
///
/// Stream errors keep their status, so an oversized body answers `413` and names the cap.
async fn read_submission(
    mut multipart: Multipart,
    limit: UploadLimit,
) -> Result<UploadSubmission, AppError> {
    let malformed = |error: MultipartError| {
        let status = error.status();
        tracing::info!(error = %error, %status, "Unreadable multipart body");
        let text = if status == StatusCode::PAYLOAD_TOO_LARGE {
            format!("Upload exceeds the maximum request size of {} bytes.", limit.0)
        } else {
            error.body_text()
        };
        AppError::rejected_upload(status, text)
    };

    let mut submission = UploadSubmission::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "set_name" => submission.set_name = Some(field.text().await.map_err(malformed)?),
            "documents" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                submission.documents.push(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }
    Ok(submission)
}

/// Response body for `GET /sets`.
#[derive(Serialize)]
struct SetsResponse {
    document_sets: Vec<DocumentSet>,
}

/// List the caller's document sets.
async fn list_sets<S>(
    State(service): State<Arc<S>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SetsResponse>, AppError>
where
    S: DocumentApi + 'static,
{
    let document_sets = service.list_sets(&user).await?;
    Ok(Json(SetsResponse { document_sets }))
}

/// Request body for `POST /summary`.
#[derive(Deserialize)]
struct SummaryRequest {
    #[serde(default)]
    document_set: Option<serde_json::Value>,
}

/// Response body for `POST /summary`.
#[derive(Serialize)]
struct SummaryResponse {
    document_set: DocumentSet,
    summary: String,
    messages: Vec<Notice>,
}

/// Summarize one of the caller's sets.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: DocumentApi + 'static,
{
    let Json(request) = request.map_err(|rejection| {
        tracing::info!(status = %rejection.status(), "Rejected summary request body");
        AppError::Validation {
            status: rejection.status(),
            errors: FieldErrors::single(NON_FIELD_ERRORS, rejection.body_text()),
            messages: Vec::new(),
        }
    })?;
    let outcome = service.summarize(&user, request.document_set).await?;
    Ok(Json(SummaryResponse {
        document_set: outcome.document_set,
        summary: outcome.summary,
        messages: outcome.notices,
    }))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: DocumentApi + 'static,
{
    Json(service.metrics_snapshot())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/sets",
                description: "Multipart upload: a `set_name` field and one or more `documents` files. Creates a document set owned by the caller.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_sets",
                method: "GET",
                path: "/sets",
                description: "Return the caller's document sets with their document counts.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summary",
                description: "Summarize the document titles of one of the caller's sets with the configured language model.",
                request_example: Some(json!({ "document_set": 1 })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and summary counters.",
                request_example: None,
            },
        ],
    })
}

/// Errors mapped onto HTTP responses.
enum AppError {
    /// Input rejected with field-level detail. `status` is `400` unless the body itself
    /// could not be read (`413`, `415`).
    Validation {
        status: StatusCode,
        errors: FieldErrors,
        messages: Vec<Notice>,
    },
    /// Store or IO failure; details are logged, not returned.
    Internal(String),
}

impl AppError {
    fn invalid(errors: FieldErrors, messages: Vec<Notice>) -> Self {
        Self::Validation {
            status: StatusCode::BAD_REQUEST,
            errors,
            messages,
        }
    }

    /// Upload body that never reached validation.
    fn rejected_upload(status: StatusCode, text: impl Into<String>) -> Self {
        Self::Validation {
            status,
            errors: FieldErrors::single(NON_FIELD_ERRORS, text),
            messages: vec![Notice::error(UPLOAD_FAILED)],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation {
                status,
                errors,
                messages,
            } => (
                status,
                Json(json!({ "errors": errors, "messages": messages })),
            )
                .into_response(),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": { "code": "internal", "message": "Internal server error." }
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(inner: StoreError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        match inner {
            UploadError::Invalid(errors) => {
                Self::invalid(errors, vec![Notice::error(UPLOAD_FAILED)])
            }
            UploadError::Store(error) => error.into(),
        }
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        match inner {
            SummarizeError::Selection(SelectionError::Invalid(errors)) => {
                Self::invalid(errors, Vec::new())
            }
            SummarizeError::Selection(SelectionError::Store(error))
            | SummarizeError::Store(error) => error.into(),
        }
    }
}
