//! Blob storage for posters and QR images
//!
//! `put` returns the public URL the stored object is reachable at. `delete`
//! is best effort and only used to clean up objects nothing references.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::config::StorageConfig;
use crate::utils::errors::{ClubHubError, Result};

const SERVICE: &str = "blob store";

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Reject keys that are empty, absolute, or climb out of the store root
fn check_key(key: &str) -> Result<&Path> {
    let path = Path::new(key);
    let plain = !key.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if !plain {
        return Err(ClubHubError::Validation(format!("invalid blob key: {}", key)));
    }
    Ok(path)
}

/// Stores blobs as files under a root directory; the HTTP layer serves that
/// directory under the public base URL.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base: Url,
}

impl FsBlobStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let public_base = Url::parse(&config.public_base_url).map_err(|e| {
            ClubHubError::Config(format!("Invalid public base URL {}: {}", config.public_base_url, e))
        })?;

        Ok(Self {
            root: PathBuf::from(&config.root_dir),
            public_base,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let relative = check_key(key)?;
        let path = self.root.join(relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClubHubError::upstream(SERVICE, e.to_string()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ClubHubError::upstream(SERVICE, e.to_string()))?;

        let url = self
            .public_base
            .join(key)
            .map_err(|e| ClubHubError::upstream(SERVICE, e.to_string()))?;

        debug!(key = key, content_type = content_type, size = bytes.len(), "Blob stored");
        Ok(url.to_string())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.root.join(check_key(key)?);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(key = key, error = %e, "Failed to delete blob");
                Err(ClubHubError::upstream(SERVICE, e.to_string()))
            }
        }
    }
}

/// Keeps blobs in memory; failures can be switched on to exercise the
/// upload-failure paths.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        check_key(key)?;
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClubHubError::upstream(SERVICE, "injected upload failure"));
        }

        self.objects
            .lock()
            .map_err(|_| ClubHubError::upstream(SERVICE, "store poisoned"))?
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(format!("memory://blobs/{}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .lock()
            .map_err(|_| ClubHubError::upstream(SERVICE, "store poisoned"))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fs_store(root: &Path) -> FsBlobStore {
        FsBlobStore::new(&StorageConfig {
            root_dir: root.to_string_lossy().to_string(),
            public_base_url: "http://localhost:8080/blobs/".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fs_put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let url = store
            .put("qr/event/student.svg", b"<svg/>".to_vec(), "image/svg+xml")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8080/blobs/qr/event/student.svg");
        let written = std::fs::read(dir.path().join("qr/event/student.svg")).unwrap();
        assert_eq!(written, b"<svg/>");

        store.delete("qr/event/student.svg").await.unwrap();
        assert!(!dir.path().join("qr/event/student.svg").exists());
        // Deleting again is fine
        store.delete("qr/event/student.svg").await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        assert_matches!(
            store.put("../outside.svg", vec![1], "image/svg+xml").await,
            Err(ClubHubError::Validation(_))
        );
        assert_matches!(
            store.put("/etc/passwd", vec![1], "text/plain").await,
            Err(ClubHubError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryBlobStore::new();
        store.set_failing(true);
        assert_matches!(
            store.put("a.svg", vec![1], "image/svg+xml").await,
            Err(ClubHubError::Upstream { .. })
        );
        assert!(store.is_empty());

        store.set_failing(false);
        store.put("a.svg", vec![1], "image/svg+xml").await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
