//! Artifact byte storage collaborator

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by artifact storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for artifact storage backends
///
/// The index only ever addresses storage through opaque keys produced by
/// the storage locator; byte serving to clients stays outside this crate.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload artifact bytes under a storage key
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Download artifact bytes for a storage key
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if a storage key holds an artifact
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Local filesystem artifact storage (for tests and single-node use)
pub struct LocalBlobStorage {
    base_path: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a key under the storage root
    ///
    /// Keys are always single path components; anything carrying separators
    /// or dot-dot segments is refused outright even though the locator never
    /// produces such keys.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(key)?;

        // Create parent directory if needed
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve(key)?;
        match tokio::fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve(key)?;
        Ok(full_path.exists())
    }
}
