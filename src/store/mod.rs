//! Document store: SQLite metadata plus filesystem blobs.
//!
//! Sets and their documents are written in one transaction after every blob has been
//! flushed to disk. Readers therefore never observe a set with a partial document list,
//! and no document row ever points at missing bytes.

pub mod blobs;
pub mod db;
pub mod types;

pub use blobs::BlobStore;
pub use types::{Document, DocumentSet, NewDocument, StoreError, User};

use sqlx::{SqliteConnection, SqlitePool};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Maximum stored length of a document title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

const SET_COLUMNS: &str = "s.id, s.name, s.owner_id, s.created_at, \
     (SELECT COUNT(*) FROM documents d WHERE d.document_set_id = s.id) AS document_count";

/// Durable storage for users, document sets, and documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    blobs: BlobStore,
}

impl DocumentStore {
    /// Wrap an existing pool and blob store. The schema must already exist.
    pub fn new(pool: SqlitePool, blobs: BlobStore) -> Self {
        Self { pool, blobs }
    }

    /// Connect to the database at `database_path`, run migrations, and use `media_root` for blobs.
    pub async fn open(
        database_path: &std::path::Path,
        media_root: impl Into<std::path::PathBuf>,
    ) -> Result<Self, StoreError> {
        let pool = db::connect(database_path).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool, BlobStore::new(media_root)))
    }

    /// Blob store backing document content.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Provision a user identified by the hex digest of their bearer token.
    pub async fn create_user(&self, username: &str, token_hash: &str) -> Result<User, StoreError> {
        let created_at = current_timestamp_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (username, token_hash, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(username)
        .bind(token_hash)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(db) = &error {
                if db.is_unique_violation() {
                    return StoreError::DuplicateUser(username.to_string());
                }
            }
            StoreError::Database(error)
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            created_at,
        })
    }

    /// Resolve the user owning a token digest.
    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE token_hash = ?1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Look a user up by name.
    pub async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Create an empty set owned by `owner_id` and return its identifier.
    pub async fn create(&self, set_name: &str, owner_id: i64) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_set(&mut conn, set_name, owner_id).await
    }

    /// Store `bytes` as a new document of an existing set and return the document identifier.
    pub async fn add(
        &self,
        document_set_id: i64,
        bytes: &[u8],
        filename: &str,
    ) -> Result<i64, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM document_sets WHERE id = ?1")
                .bind(document_set_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(StoreError::SetNotFound(document_set_id));
        }

        let file_path = self.blobs.write(filename, bytes).await?;
        let mut conn = self.pool.acquire().await?;
        match insert_document(&mut conn, document_set_id, filename, &file_path).await {
            Ok(id) => Ok(id),
            Err(error) => {
                self.blobs.discard(std::slice::from_ref(&file_path)).await;
                Err(error)
            }
        }
    }

    /// Create a set together with all of its documents.
    ///
    /// Blobs are written first. The set row and every document row are then inserted in
    /// a single transaction; on any failure the transaction rolls back and the written
    /// blobs are removed again.
    pub async fn create_with_documents(
        &self,
        owner_id: i64,
        set_name: &str,
        files: &[NewDocument],
    ) -> Result<DocumentSet, StoreError> {
        let mut written = Vec::with_capacity(files.len());
        for file in files {
            match self.blobs.write(&file.filename, &file.bytes).await {
                Ok(path) => written.push(path),
                Err(error) => {
                    self.blobs.discard(&written).await;
                    return Err(error);
                }
            }
        }

        match self
            .insert_set_with_documents(owner_id, set_name, files, &written)
            .await
        {
            Ok(set) => Ok(set),
            Err(error) => {
                tracing::warn!(owner_id, error = %error, "Set creation rolled back");
                self.blobs.discard(&written).await;
                Err(error)
            }
        }
    }

    async fn insert_set_with_documents(
        &self,
        owner_id: i64,
        set_name: &str,
        files: &[NewDocument],
        paths: &[String],
    ) -> Result<DocumentSet, StoreError> {
        let mut tx = self.pool.begin().await?;
        let set_id = insert_set(&mut tx, set_name, owner_id).await?;
        for (file, path) in files.iter().zip(paths) {
            insert_document(&mut tx, set_id, &file.filename, path).await?;
        }
        let set = fetch_set(&mut tx, set_id).await?;
        tx.commit().await?;
        Ok(set)
    }

    /// Sets owned by `owner_id`, in insertion order.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<DocumentSet>, StoreError> {
        let sets = sqlx::query_as::<_, DocumentSet>(&format!(
            "SELECT {SET_COLUMNS} FROM document_sets s WHERE s.owner_id = ?1 ORDER BY s.id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sets)
    }

    /// The set `set_id` if, and only if, it belongs to `owner_id`.
    pub async fn find_owned(
        &self,
        owner_id: i64,
        set_id: i64,
    ) -> Result<Option<DocumentSet>, StoreError> {
        let set = sqlx::query_as::<_, DocumentSet>(&format!(
            "SELECT {SET_COLUMNS} FROM document_sets s WHERE s.id = ?1 AND s.owner_id = ?2"
        ))
        .bind(set_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(set)
    }

    /// Titles of the documents in a set, in storage order.
    pub async fn list_documents(&self, document_set_id: i64) -> Result<Vec<String>, StoreError> {
        let titles = sqlx::query_scalar::<_, String>(
            "SELECT title FROM documents WHERE document_set_id = ?1 ORDER BY id",
        )
        .bind(document_set_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    /// Full document rows of a set, in storage order.
    pub async fn documents(&self, document_set_id: i64) -> Result<Vec<Document>, StoreError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT id, document_set_id, title, file_path, uploaded_at \
             FROM documents WHERE document_set_id = ?1 ORDER BY id",
        )
        .bind(document_set_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    /// Delete a set owned by `owner_id`, cascading to its documents and their blobs.
    ///
    /// Document rows and the set row go in one transaction; blobs are removed only after it
    /// commits. Returns `false` when no such set belongs to the owner.
    pub async fn delete_set(&self, owner_id: i64, set_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let paths = sqlx::query_scalar::<_, String>(
            "DELETE FROM documents WHERE document_set_id = \
             (SELECT id FROM document_sets WHERE id = ?1 AND owner_id = ?2) \
             RETURNING file_path",
        )
        .bind(set_id)
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM document_sets WHERE id = ?1 AND owner_id = ?2")
            .bind(set_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;

        for path in &paths {
            self.blobs.remove(path).await?;
        }
        tracing::info!(set_id, owner_id, documents = paths.len(), "Document set deleted");
        Ok(true)
    }
}

async fn insert_set(
    conn: &mut SqliteConnection,
    name: &str,
    owner_id: i64,
) -> Result<i64, StoreError> {
    let result =
        sqlx::query("INSERT INTO document_sets (name, owner_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(name)
            .bind(owner_id)
            .bind(current_timestamp_rfc3339())
            .execute(&mut *conn)
            .await?;
    Ok(result.last_insert_rowid())
}

async fn insert_document(
    conn: &mut SqliteConnection,
    document_set_id: i64,
    filename: &str,
    file_path: &str,
) -> Result<i64, StoreError> {
    let result = sqlx::query(
        "INSERT INTO documents (document_set_id, title, file_path, uploaded_at) \
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(document_set_id)
    .bind(title_from_filename(filename))
    .bind(file_path)
    .bind(current_timestamp_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

async fn fetch_set(conn: &mut SqliteConnection, set_id: i64) -> Result<DocumentSet, StoreError> {
    sqlx::query_as::<_, DocumentSet>(&format!(
        "SELECT {SET_COLUMNS} FROM document_sets s WHERE s.id = ?1"
    ))
    .bind(set_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(StoreError::SetNotFound(set_id))
}

/// Title stored for an uploaded file: its base name without any client directory
/// components, capped at [`MAX_TITLE_CHARS`].
pub fn title_from_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|base| !base.trim().is_empty())
        .unwrap_or(filename);
    base.chars().take(MAX_TITLE_CHARS).collect()
}

/// Current timestamp formatted for row storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
