//! Directory-based object storage

use super::StagingStore;
use crate::error::EtlError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stage objects as files, one directory per bucket
///
/// `{root}/{bucket}/{key}`. Keys are flat file names; a key containing a path
/// separator is rejected.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, EtlError> {
        for part in [bucket, key] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(EtlError::storage(bucket, key, "invalid bucket or key"));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }

    /// Count objects in a bucket
    pub fn count(&self, bucket: &str) -> Result<usize, EtlError> {
        let dir = self.root.join(bucket);
        if !dir.exists() {
            return Ok(0);
        }

        let count = std::fs::read_dir(&dir)
            .map_err(|e| EtlError::storage(bucket, "*", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count();

        Ok(count)
    }
}

/// Run file I/O for `bucket/key` on the blocking pool
async fn blocking<T, F>(bucket: &str, key: &str, op: F) -> Result<T, EtlError>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(|e| EtlError::storage(bucket, key, e)),
        Err(e) => Err(EtlError::storage(bucket, key, e)),
    }
}

#[async_trait]
impl StagingStore for DirectoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), EtlError> {
        let path = self.object_path(bucket, key)?;
        log::debug!(
            "Writing {} bytes ({}) to {}",
            body.len(),
            content_type,
            path.display()
        );

        blocking(bucket, key, move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, body)
        })
        .await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EtlError> {
        let path = self.object_path(bucket, key)?;
        log::debug!("Reading {}", path.display());
        blocking(bucket, key, move || std::fs::read(&path)).await
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path());

        store
            .put("raw-data", "a.json", b"[1,2]".to_vec(), "application/json")
            .await
            .unwrap();

        assert_eq!(store.get("raw-data", "a.json").await.unwrap(), b"[1,2]");
        assert!(temp.path().join("raw-data/a.json").exists());
        assert_eq!(store.count("raw-data").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path());

        store
            .put("raw-data", "a.json", b"first".to_vec(), "text/plain")
            .await
            .unwrap();
        store
            .put("raw-data", "a.json", b"second".to_vec(), "text/plain")
            .await
            .unwrap();

        assert_eq!(store.get("raw-data", "a.json").await.unwrap(), b"second");
        assert_eq!(store.count("raw-data").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path());

        let err = store.get("raw-data", "missing.json").await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.count("raw-data").unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_puts() {
        let temp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(DirectoryStore::new(temp.path()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let key = format!("sample_data_{}.json", i);
                    store
                        .put("raw-data", &key, vec![b'x'; 1024], "application/json")
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.count("raw-data").unwrap(), 8);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp.path());

        let err = store
            .put("raw-data", "../escape.json", Vec::new(), "application/json")
            .await
            .unwrap_err();
        assert!(err.is_storage());
    }
}
