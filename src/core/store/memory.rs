//! In-memory metadata store

use crate::core::service::PackageName;
use crate::core::store::{MetadataStore, PackageVersion, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Metadata store backed by a process-local map
///
/// The write lock makes `insert_if_absent` and `increment_download`
/// indivisible, and the per-name vector preserves insertion order for
/// listings. Suitable for tests and embedded single-process use; nothing
/// survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    packages: Arc<RwLock<HashMap<PackageName, Vec<PackageVersion>>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            packages: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert_if_absent(
        &self,
        record: PackageVersion,
    ) -> Result<PackageVersion, StoreError> {
        let mut packages = self.packages.write().await;

        if let Some(versions) = packages.get(&record.name) {
            if let Some(first) = versions.first() {
                if first.author != record.author {
                    return Err(StoreError::OwnerMismatch(format!(
                        "{} is owned by {}",
                        record.name, first.author
                    )));
                }
            }
            if versions.iter().any(|v| v.version == record.version) {
                return Err(StoreError::AlreadyExists(format!(
                    "{} {}",
                    record.name, record.version
                )));
            }
        }

        packages
            .entry(record.name.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn get_version(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<Option<PackageVersion>, StoreError> {
        let packages = self.packages.read().await;
        Ok(packages
            .get(name)
            .and_then(|versions| versions.iter().find(|v| v.version == version))
            .cloned())
    }

    async fn list_versions(&self, name: &PackageName) -> Result<Vec<PackageVersion>, StoreError> {
        let packages = self.packages.read().await;
        Ok(packages.get(name).cloned().unwrap_or_default())
    }

    async fn increment_download(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<u64, StoreError> {
        let mut packages = self.packages.write().await;
        let record = packages
            .get_mut(name)
            .and_then(|versions| versions.iter_mut().find(|v| v.version == version))
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", name, version)))?;
        record.downloads += 1;
        Ok(record.downloads)
    }
}
