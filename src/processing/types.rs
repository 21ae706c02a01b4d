//! Request, outcome, and error types for the upload and summarization pipeline.

use crate::store::{DocumentSet, StoreError};
use crate::summarization::ChatClientError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name used for errors that do not belong to a single input.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation messages, keyed by input name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Single-entry collection, handy for one-off rejections.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

/// Severity of a transient user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Operation completed.
    Success,
    /// Operation failed or degraded.
    Error,
}

/// One-shot message shown to the user alongside a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity of the message.
    pub level: NoticeLevel,
    /// Human-readable text.
    pub text: String,
}

impl Notice {
    /// Success notice.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    /// Error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// File part received from a client, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename, when the part carried one.
    pub filename: Option<String>,
    /// Raw part contents.
    pub bytes: Vec<u8>,
}

/// Upload submission as received, before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadSubmission {
    /// Raw `set_name` input.
    pub set_name: Option<String>,
    /// Raw `documents` parts.
    pub documents: Vec<UploadedFile>,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Newly created set, including its document count.
    pub document_set: DocumentSet,
    /// Notices for the client.
    pub notices: Vec<Notice>,
}

/// Coarse classification of how a summary request ended, used for metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStatus {
    /// At least one line survived filtering.
    Generated,
    /// Model answered, but nothing matched the expected format.
    NoValidLines,
    /// The set held no documents, so the model was not called.
    EmptySet,
    /// The model call failed.
    Failed,
}

/// Rendered summary of a document set.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    /// Set that was summarized.
    pub document_set: DocumentSet,
    /// Display-ready HTML fragment or one of the fixed fallback strings.
    pub summary: String,
    /// How the request ended.
    pub status: SummaryStatus,
    /// Notices for the client, including raw provider errors.
    pub notices: Vec<Notice>,
}

/// Errors raised by the upload handler.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Submission failed validation; nothing was written.
    #[error("Upload failed validation")]
    Invalid(FieldErrors),
    /// Persisting the set failed after validation.
    #[error("Failed to store upload: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while selecting a document set.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Selection was missing, malformed, or not owned by the caller.
    #[error("Invalid document set selection")]
    Invalid(FieldErrors),
    /// Looking the set up failed.
    #[error("Failed to load document set: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while producing a summary. Model failures are not errors here; they
/// become the fixed fallback text plus a notice.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Selection was rejected.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Reading titles failed.
    #[error("Failed to load document titles: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while assembling the service at startup.
#[derive(Debug, Error)]
pub enum InitError {
    /// Database or media directory could not be opened.
    #[error("Failed to open document store: {0}")]
    Store(#[from] StoreError),
    /// Chat client could not be constructed.
    #[error("Failed to build chat client: {0}")]
    Chat(#[from] ChatClientError),
}

/// Outcome of the external model call as seen by the pipeline.
pub(crate) type ModelReply = Result<String, ChatClientError>;
