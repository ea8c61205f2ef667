use crate::traits::{ObjectStore, ObjectStream, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Buckets are subdirectories of the root; keys are relative paths below the
/// bucket. Used by tests and the direct runner mode.
#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a new LocalObjectStore instance rooted at `root`
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore { root })
    }

    /// Convert bucket and key to a filesystem path with security validation
    ///
    /// Rejects bucket or key components that could escape the storage root.
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        for part in [bucket, key] {
            if part.is_empty()
                || part.starts_with('/')
                || part.split('/').any(|segment| segment == "..")
            {
                return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
            }
        }

        Ok(self.root.join(bucket).join(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn object_size(&self, bucket: &str, key: &str) -> StorageResult<u64> {
        let path = self.object_path(bucket, key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }

        let meta = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Ok(meta.len())
    }

    async fn get_stream(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let path = self.object_path(bucket, key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let reader = tokio_util::io::ReaderStream::new(file);

        let stream = reader.map(|result| {
            result.map_err(|e| StorageError::ReadFailed(format!("Failed to read chunk: {}", e)))
        });

        let key = key.to_string();
        let path_display = path.display().to_string();
        let logged_stream = stream.map(move |item| {
            if item.is_err() {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream read error"
                );
            }
            item
        });

        Ok(Box::pin(logged_stream))
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let path = self.object_path(bucket, key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    async fn collect(mut stream: ObjectStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn put_then_stream_round_trip() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        let data = b"entry content".to_vec();
        store
            .put("dst-bucket", "2024-01-15/a.txt", data.clone())
            .await
            .unwrap();

        let stream = store.get_stream("dst-bucket", "2024-01-15/a.txt").await.unwrap();
        assert_eq!(collect(stream).await, data);
    }

    #[tokio::test]
    async fn object_size_matches_written_bytes() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        store
            .put("src", "archive.tar.gz", vec![0u8; 1234])
            .await
            .unwrap();

        assert_eq!(store.object_size("src", "archive.tar.gz").await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        let size = store.object_size("src", "missing.tar.gz").await;
        assert!(matches!(size, Err(StorageError::NotFound(_))));

        let stream = store.get_stream("src", "missing.tar.gz").await;
        assert!(matches!(stream, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        store.put("dst", "k.txt", b"first".to_vec()).await.unwrap();
        store.put("dst", "k.txt", b"second".to_vec()).await.unwrap();

        let stream = store.get_stream("dst", "k.txt").await.unwrap();
        assert_eq!(collect(stream).await, b"second");
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        let result = store.put("dst", "../../etc/passwd", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.object_size("..", "passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.exists("dst", "/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn exists_reflects_object_presence() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        assert!(!store.exists("dst", "k.txt").await.unwrap());
        store.put("dst", "k.txt", b"x".to_vec()).await.unwrap();
        assert!(store.exists("dst", "k.txt").await.unwrap());
    }
}
