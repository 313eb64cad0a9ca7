use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use super::{resolve_object_path, validate_bucket, write_new_file, ObjectStore, StorageError};

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn object_file(&self, bucket: &str, path: &str) -> Result<PathBuf, StorageError> {
        validate_bucket(bucket)?;
        resolve_object_path(&self.root.join(bucket), path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload(&self, bucket: &str, path: &str, content: Bytes) -> Result<(), StorageError> {
        let target = self.object_file(bucket, path)?;
        write_new_file(&target, &content)
            .await
            .map_err(|e| match e {
                StorageError::AlreadyExists(_) => {
                    StorageError::AlreadyExists(format!("{}/{}", bucket, path))
                }
                other => other,
            })?;
        info!(bucket, path, "uploaded object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path.trim_start_matches('/'))
    }

    fn path_from_public_url(&self, bucket: &str, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.public_base_url, bucket);
        url.strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }

    #[instrument(skip(self))]
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let target = self.object_file(bucket, path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => info!(bucket, path = %path, "removed object"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(bucket, path = %path, "object already absent");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalObjectStore {
        LocalObjectStore::new(dir.path(), "http://localhost:8080/storage/")
    }

    #[tokio::test]
    async fn upload_then_remove_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .upload("tenant-docs", "aadhar/101_1_card.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        let on_disk = dir.path().join("tenant-docs/aadhar/101_1_card.png");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"png");

        store
            .remove("tenant-docs", &["aadhar/101_1_card.png".to_string()])
            .await
            .unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn upload_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .upload("tenant-docs", "pan/a.pdf", Bytes::from_static(b"one"))
            .await
            .unwrap();
        let second = store
            .upload("tenant-docs", "pan/a.pdf", Bytes::from_static(b"two"))
            .await;
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn removing_missing_objects_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store
            .remove("tenant-docs", &["nope/missing.pdf".to_string()])
            .await
            .is_ok());
    }

    #[test]
    fn public_urls_round_trip_to_paths() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store.public_url("tenant-docs", "payments/x_1_proof.jpg");
        assert_eq!(
            url,
            "http://localhost:8080/storage/tenant-docs/payments/x_1_proof.jpg"
        );
        assert_eq!(
            store.path_from_public_url("tenant-docs", &url).as_deref(),
            Some("payments/x_1_proof.jpg")
        );
        assert!(store
            .path_from_public_url("tenant-docs", "https://elsewhere.example.com/a.png")
            .is_none());
    }
}
