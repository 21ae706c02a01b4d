//! Filesystem-backed blob storage for uploaded file bytes.

use std::path::PathBuf;
use uuid::Uuid;

use super::StoreError;

const DOCUMENTS_PREFIX: &str = "documents";
const MAX_EXTENSION_LEN: usize = 16;

/// Writes and removes blobs under a media root, addressed by generated relative paths.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a blob store rooted at `root`. Directories are created lazily on write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist `bytes` under a freshly generated path and return that relative path.
    ///
    /// The write is flushed before returning, so the path is only handed out once the
    /// content is durable.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let relative = generate_blob_path(filename);
        let absolute = self.resolve(&relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(&relative, source))?;
        }

        let mut file = tokio::fs::File::create(&absolute)
            .await
            .map_err(|source| io_error(&relative, source))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, bytes)
            .await
            .map_err(|source| io_error(&relative, source))?;
        file.sync_all()
            .await
            .map_err(|source| io_error(&relative, source))?;

        tracing::debug!(path = %relative, bytes = bytes.len(), "Stored blob");
        Ok(relative)
    }

    /// Read a blob back by its relative path.
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, StoreError> {
        tokio::fs::read(self.resolve(relative))
            .await
            .map_err(|source| io_error(relative, source))
    }

    /// Remove a blob. Missing files are ignored.
    pub async fn remove(&self, relative: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.resolve(relative)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(relative, source)),
        }
    }

    /// Best-effort removal used while unwinding a failed upload.
    pub(crate) async fn discard(&self, paths: &[String]) {
        for path in paths {
            if let Err(error) = self.remove(path).await {
                tracing::warn!(path = %path, error = %error, "Failed to discard blob");
            }
        }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

fn io_error(path: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_string(),
        source,
    }
}

/// Build `documents/<uuid>[.<ext>]`, keeping a short alphanumeric extension from the
/// client filename. The client name never reaches the filesystem otherwise.
pub(crate) fn generate_blob_path(filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match sanitized_extension(filename) {
        Some(ext) => format!("{DOCUMENTS_PREFIX}/{id}.{ext}"),
        None => format!("{DOCUMENTS_PREFIX}/{id}"),
    }
}

fn sanitized_extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_path_keeps_safe_extension_only() {
        let path = generate_blob_path("Report.PDF");
        assert!(path.starts_with("documents/"));
        assert!(path.ends_with(".pdf"));

        let path = generate_blob_path("../../etc/passwd");
        assert!(!path.contains(".."));
        assert_eq!(path.matches('/').count(), 1);

        let path = generate_blob_path("archive.tar.g$z");
        assert!(!path.contains('$'));
    }

    #[test]
    fn dotfiles_have_no_extension() {
        assert!(sanitized_extension(".bashrc").is_none());
        assert_eq!(sanitized_extension("notes.md").as_deref(), Some("md"));
    }

    #[tokio::test]
    async fn write_read_and_remove_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::new(dir.path());

        let path = store.write("paper.txt", b"hello").await.expect("write");
        assert_eq!(store.read(&path).await.expect("read"), b"hello");

        store.remove(&path).await.expect("remove");
        assert!(store.read(&path).await.is_err());
        store.remove(&path).await.expect("second remove is a no-op");
    }
}
