//! Row types and errors shared by the document store.

use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;

/// Errors returned while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a query or the pool could not hand out a connection.
    #[error("Database request failed: {0}")]
    Database(#[from] sqlx::Error),
    /// Blob bytes or the database directory could not be written, read, or removed.
    #[error("Filesystem access failed for {path}: {source}")]
    Io {
        /// Path that was being accessed.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Referenced document set does not exist.
    #[error("Document set {0} not found")]
    SetNotFound(i64),
    /// A username was provisioned twice.
    #[error("User '{0}' already exists")]
    DuplicateUser(String),
}

/// Identity that owns document sets.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    /// Database identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Named collection of uploaded documents owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DocumentSet {
    /// Database identifier.
    pub id: i64,
    /// User supplied display name.
    pub name: String,
    /// Identifier of the owning user.
    pub owner_id: i64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Number of documents stored in the set.
    pub document_count: i64,
}

/// One uploaded file and its display title.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Document {
    /// Database identifier.
    pub id: i64,
    /// Parent set identifier.
    pub document_set_id: i64,
    /// Display title, defaulting to the original filename.
    pub title: String,
    /// Blob path relative to the media root.
    pub file_path: String,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
}

/// File accepted by the upload handler and waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Original client-side filename.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}
