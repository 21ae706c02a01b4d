use crate::auth::hash_token;
use crate::config::Config;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::store::{DocumentSet, DocumentStore, StoreError, User};
use crate::summarization::{ChatClient, get_chat_client};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::selection::select_document_set;
use super::summarize::summarize_titles;
use super::types::{
    InitError, Notice, SummarizeError, SummaryOutcome, UploadError, UploadOutcome,
    UploadSubmission,
};
use super::upload::validate_upload;

/// Message attached to a successful upload.
pub const UPLOAD_SUCCESS: &str = "Documents uploaded successfully.";

/// Operations exposed to the HTTP layer.
///
/// Every call takes the acting user explicitly; nothing reads an ambient session.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Resolve a bearer token to its user.
    async fn authenticate(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// Validate a submission and persist it as a new set owned by `owner`.
    async fn upload_documents(
        &self,
        owner: &User,
        submission: UploadSubmission,
    ) -> Result<UploadOutcome, UploadError>;

    /// Sets owned by `owner`.
    async fn list_sets(&self, owner: &User) -> Result<Vec<DocumentSet>, StoreError>;

    /// Summarize the titles of the set chosen by `selection`.
    async fn summarize(
        &self,
        owner: &User,
        selection: Option<Value>,
    ) -> Result<SummaryOutcome, SummarizeError>;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates the document store, the chat client, and metrics.
///
/// Construct once at startup and share through an `Arc`; the HTTP router and the admin
/// CLI both drive the same instance type.
pub struct DocumentService {
    store: DocumentStore,
    chat: Box<dyn ChatClient>,
    model: String,
    metrics: Arc<PipelineMetrics>,
}

impl DocumentService {
    /// Assemble a service from already-built parts.
    pub fn new(store: DocumentStore, chat: Box<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            store,
            chat,
            model: model.into(),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Open the store and chat client described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, InitError> {
        tracing::info!(path = %config.database_path.display(), "Opening document store");
        let store = DocumentStore::open(&config.database_path, config.media_root.clone()).await?;
        let chat = get_chat_client(config)?;
        tracing::info!(
            ollama_url = %config.ollama_url,
            model = %config.summarization_model,
            "Chat client initialized"
        );
        Ok(Self::new(store, Box::new(chat), config.summarization_model.clone()))
    }

    /// Underlying store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Validate and persist an upload.
    ///
    /// Validation runs before any write. Blobs and rows are then written by
    /// [`DocumentStore::create_with_documents`], which either stores everything or nothing.
    pub async fn upload_documents(
        &self,
        owner: &User,
        submission: UploadSubmission,
    ) -> Result<UploadOutcome, UploadError> {
        let upload = validate_upload(submission).map_err(|errors| {
            tracing::info!(owner_id = owner.id, ?errors, "Upload rejected");
            UploadError::Invalid(errors)
        })?;

        let document_set = self
            .store
            .create_with_documents(owner.id, &upload.set_name, &upload.documents)
            .await?;

        self.metrics
            .record_upload(document_set.document_count.max(0) as u64);
        tracing::info!(
            owner_id = owner.id,
            set_id = document_set.id,
            documents = document_set.document_count,
            "Document set uploaded"
        );

        Ok(UploadOutcome {
            document_set,
            notices: vec![Notice::success(UPLOAD_SUCCESS)],
        })
    }

    /// Run the summarization pipeline for the set chosen by `selection`.
    ///
    /// Ownership is checked before titles are read. Model failures do not surface as
    /// errors; they yield the fixed error summary and a notice carrying the provider message.
    pub async fn summarize(
        &self,
        owner: &User,
        selection: Option<Value>,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let document_set = select_document_set(&self.store, owner.id, selection.as_ref()).await?;
        let titles = self.store.list_documents(document_set.id).await?;

        tracing::info!(
            owner_id = owner.id,
            set_id = document_set.id,
            titles = titles.len(),
            model = %self.model,
            "Summarizing document set"
        );
        let rendered = summarize_titles(self.chat.as_ref(), &self.model, &titles).await;
        self.metrics.record_summary(rendered.status);
        tracing::info!(
            set_id = document_set.id,
            status = ?rendered.status,
            "Summary request completed"
        );

        Ok(SummaryOutcome {
            document_set,
            summary: rendered.summary,
            status: rendered.status,
            notices: rendered.notices,
        })
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn authenticate(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.store.find_user_by_token_hash(&hash_token(token)).await
    }

    async fn upload_documents(
        &self,
        owner: &User,
        submission: UploadSubmission,
    ) -> Result<UploadOutcome, UploadError> {
        DocumentService::upload_documents(self, owner, submission).await
    }

    async fn list_sets(&self, owner: &User) -> Result<Vec<DocumentSet>, StoreError> {
        self.store.list_by_owner(owner.id).await
    }

    async fn summarize(
        &self,
        owner: &User,
        selection: Option<Value>,
    ) -> Result<SummaryOutcome, SummarizeError> {
        DocumentService::summarize(self, owner, selection).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
