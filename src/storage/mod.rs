//! Blob storage for uploaded documents.
//!
//! Objects are addressed by `(bucket, path)` and exposed through a public URL
//! built from the configured base URL. [`LocalObjectStore`] keeps blobs on
//! disk under `{root}/{bucket}/{path}`; the server mounts the same root at
//! `/storage` so the URLs it hands out resolve.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument, warn};

mod local;

pub use local::LocalObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage gateway used by every file-bearing operation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `content` at `path`; fails when the object already exists.
    async fn upload(&self, bucket: &str, path: &str, content: Bytes) -> Result<(), StorageError>;

    /// Public URL for an object. Pure; does not check existence.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Inverse of [`ObjectStore::public_url`] for URLs this store produced.
    fn path_from_public_url(&self, bucket: &str, url: &str) -> Option<String>;

    /// Removes the given objects. Missing objects are ignored.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError>;
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
}

/// An [`ObjectStore`] bound to one bucket.
#[derive(Clone)]
pub struct BucketHandle {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl BucketHandle {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.bucket
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn put(&self, path: &str, content: Bytes) -> Result<StoredObject, StorageError> {
        self.store.upload(&self.bucket, path, content).await?;
        Ok(StoredObject {
            path: path.to_string(),
            public_url: self.store.public_url(&self.bucket, path),
        })
    }

    /// Uploads to `{folder}/{owner}_{millis}_{file_name}`.
    pub async fn put_timestamped(
        &self,
        folder: &str,
        owner: &str,
        file_name: &str,
        content: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let path = timestamped_path(folder, owner, file_name);
        self.put(&path, content).await
    }

    /// Best-effort removal of a blob whose row write failed.
    pub async fn discard(&self, path: &str) {
        error!(bucket = %self.bucket, path, "row write failed after upload; removing orphaned blob");
        if let Err(e) = self.store.remove(&self.bucket, &[path.to_string()]).await {
            error!(bucket = %self.bucket, path, error = %e, "orphaned blob left in storage");
        }
    }

    /// Removes the blob behind a public URL this bucket issued.
    /// Returns `false` for URLs that point elsewhere.
    pub async fn remove_by_url(&self, url: &str) -> Result<bool, StorageError> {
        match self.store.path_from_public_url(&self.bucket, url) {
            Some(path) => {
                self.store.remove(&self.bucket, &[path]).await?;
                Ok(true)
            }
            None => {
                warn!(bucket = %self.bucket, url, "url is not served by this bucket; leaving it");
                Ok(false)
            }
        }
    }
}

/// Reduces an uploaded file name to characters that are safe in a path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// `{folder}/{owner}_{millis}_{file_name}` with the file name sanitised.
pub fn timestamped_path(folder: &str, owner: &str, file_name: &str) -> String {
    format!(
        "{}/{}_{}_{}",
        folder.trim_matches('/'),
        sanitize_file_name(owner),
        Utc::now().timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

/// Validates a relative object path and resolves it below `base`.
pub(crate) fn resolve_object_path(base: &Path, path: &str) -> Result<PathBuf, StorageError> {
    let relative = Path::new(path);
    if path.trim().is_empty() || relative.is_absolute() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let mut resolved = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            _ => return Err(StorageError::InvalidPath(path.to_string())),
        }
    }
    Ok(resolved)
}

pub(crate) fn validate_bucket(bucket: &str) -> Result<(), StorageError> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(bucket.to_string()))
    }
}

#[instrument(skip(content), fields(bytes = content.len()))]
pub(crate) async fn write_new_file(target: &Path, content: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            warn!(path = %target.display(), "refusing to overwrite existing object");
            return Err(StorageError::AlreadyExists(target.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(content).await?;
    file.flush().await?;
    debug!(path = %target.display(), "object written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(sanitize_file_name("rent receipt (1).png"), "rent_receipt__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\lease.pdf"), "lease.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("   "), "file");
    }

    #[test]
    fn timestamped_paths_follow_folder_owner_time_name() {
        let path = timestamped_path("payments/", "sunshine-towers-101", "proof.jpg");
        assert!(path.starts_with("payments/sunshine-towers-101_"));
        assert!(path.ends_with("_proof.jpg"));
    }

    #[test]
    fn traversal_is_rejected() {
        let base = Path::new("/srv/blobs");
        assert!(resolve_object_path(base, "aadhar/a.png").is_ok());
        assert!(resolve_object_path(base, "../a.png").is_err());
        assert!(resolve_object_path(base, "/etc/passwd").is_err());
        assert!(resolve_object_path(base, "").is_err());
    }

    #[tokio::test]
    async fn bucket_handle_uploads_and_removes_by_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn ObjectStore> =
            Arc::new(LocalObjectStore::new(dir.path(), "http://localhost/storage"));
        let bucket = BucketHandle::new(store, "tenant-docs");

        let stored = bucket
            .put_timestamped("rental-agreements", "a-1", "lease.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert!(stored.public_url.starts_with("http://localhost/storage/tenant-docs/rental-agreements/a-1_"));
        assert!(dir.path().join("tenant-docs").join(&stored.path).exists());

        assert!(bucket.remove_by_url(&stored.public_url).await.unwrap());
        assert!(!dir.path().join("tenant-docs").join(&stored.path).exists());
        assert!(!bucket.remove_by_url("https://cdn.example.com/x.pdf").await.unwrap());
    }

    #[test]
    fn bucket_names_are_restricted() {
        assert!(validate_bucket("tenant-docs").is_ok());
        assert!(validate_bucket("tenant docs").is_err());
        assert!(validate_bucket("..").is_err());
    }
}
