//! Package index orchestration

use crate::core::accountant::DownloadAccountant;
use crate::core::blob_storage::{BlobStorage, StorageError};
use crate::core::ownership::OwnershipGuard;
use crate::core::service::{PackageName, Publisher, RegistryConfig, RegistryError};
use crate::core::storage_key::locate_for_write;
use crate::core::store::{MetadataStore, PackageVersion, StoreError};
use crate::core::version::{is_newer, resolve_latest};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request payload for publishing one package version
///
/// The transport layer parses its upload format into this shape; the
/// requester identity arrives separately from the auth layer.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub original_filename: String,
    pub data: Vec<u8>,
}

/// Package index over a metadata store and an artifact storage backend
///
/// Composes name validation, ownership, version ordering, storage location,
/// and download accounting. The index holds no authoritative state of its
/// own; every cross-request invariant lives in the store's atomic
/// operations, so any number of tasks can share one index.
pub struct PackageIndex {
    config: RegistryConfig,
    store: Arc<dyn MetadataStore>,
    storage: Arc<dyn BlobStorage>,
    guard: OwnershipGuard,
    accountant: DownloadAccountant,
}

impl PackageIndex {
    /// Create an index over the given store and artifact storage
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        crate::init_logging();

        info!("Initializing package index v{}", crate::VERSION);

        let guard = OwnershipGuard::new(store.clone(), config.allow_anonymous_publish);
        let accountant = DownloadAccountant::new(store.clone());

        Self {
            config,
            store,
            storage,
            guard,
            accountant,
        }
    }

    /// Publish one package version on behalf of `publisher`
    ///
    /// Artifact bytes land in storage before the record is registered, so a
    /// failed upload never leaves metadata pointing at missing bytes. A
    /// publish that loses a concurrent race surfaces the conflict instead
    /// of silently succeeding.
    pub async fn publish(
        &self,
        publisher: &Publisher,
        request: PublishRequest,
    ) -> Result<PackageVersion, RegistryError> {
        if !self.config.allow_publishing {
            return Err(RegistryError::PublishingDisabled);
        }

        let name = PackageName::new(request.name)?;
        self.guard.authorize_publish(&name, publisher).await?;

        let existing = self.store.list_versions(&name).await?;
        if let Some(latest) = resolve_latest(existing.iter().map(|v| v.version.as_str())) {
            if !is_newer(&request.version, latest) {
                return Err(RegistryError::VersionNotNewer(format!(
                    "{} is not newer than {}",
                    request.version, latest
                )));
            }
        }

        let storage_key = locate_for_write(&name, &request.version, &request.original_filename);

        self.bounded(self.storage.upload(&storage_key, &request.data)).await?;
        if !self.bounded(self.storage.exists(&storage_key)).await? {
            return Err(RegistryError::Storage(StorageError::NotFound(storage_key)));
        }

        let record = PackageVersion::new(
            name,
            request.version,
            publisher.clone(),
            request.description,
            request.dependencies,
            storage_key,
            calculate_checksum(&request.data),
        );

        let stored = match self.store.insert_if_absent(record).await {
            Ok(stored) => stored,
            Err(e) => {
                if matches!(e, StoreError::AlreadyExists(_) | StoreError::OwnerMismatch(_)) {
                    warn!("Publish lost a concurrent race: {}", e);
                }
                return Err(e.into());
            }
        };

        info!("Published {} {} by {}", stored.name, stored.version, stored.author);
        Ok(stored)
    }

    /// Look up a version's metadata, resolving to the latest published
    /// version when none is requested
    pub async fn resolve(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<PackageVersion, RegistryError> {
        let name = Self::lookup_name(name)?;

        let record = match version {
            Some(version) => self.store.get_version(&name, version).await?,
            None => latest_record(self.store.list_versions(&name).await?),
        };

        let record = record.ok_or_else(|| match version {
            Some(version) => RegistryError::NotFound(format!("{} {}", name, version)),
            None => RegistryError::NotFound(name.to_string()),
        })?;

        debug!("Resolved {} {}", record.name, record.version);
        Ok(record)
    }

    /// Resolve a version, confirm its artifact is servable, and count the
    /// install
    ///
    /// Returns the storage key the byte-transfer collaborator retrieves the
    /// artifact with. The counter only moves once the artifact has been
    /// confirmed present, so failed installs are never counted.
    pub async fn install(&self, name: &str, version: Option<&str>) -> Result<String, RegistryError> {
        let record = self.resolve(name, version).await?;

        if !self.bounded(self.storage.exists(&record.storage_key)).await? {
            warn!(
                "Artifact missing for registered version {} {}",
                record.name, record.version
            );
            return Err(RegistryError::NotFound(format!(
                "{} {}",
                record.name, record.version
            )));
        }

        self.accountant.record_install(&record.name, &record.version).await?;
        Ok(record.storage_key)
    }

    /// List all published versions of a package in publish order
    pub async fn list_versions(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        let name = Self::lookup_name(name)?;
        let versions = self.store.list_versions(&name).await?;
        if versions.is_empty() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        Ok(versions.into_iter().map(|v| v.version).collect())
    }

    /// Get the metadata store (shared instance)
    pub fn store(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    /// Get the artifact storage backend (shared instance)
    pub fn storage(&self) -> Arc<dyn BlobStorage> {
        self.storage.clone()
    }

    /// Get the index configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Malformed names cannot name a package, so lookups treat them as
    /// missing rather than invalid
    fn lookup_name(name: &str) -> Result<PackageName, RegistryError> {
        PackageName::new(name.to_string()).map_err(|_| RegistryError::NotFound(name.to_string()))
    }

    /// Bound a storage collaborator call by the configured timeout
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, RegistryError> {
        match tokio::time::timeout(self.config.storage_timeout, call).await {
            Ok(result) => result.map_err(RegistryError::from),
            Err(_) => Err(RegistryError::Storage(StorageError::Timeout(
                self.config.storage_timeout,
            ))),
        }
    }
}

/// Pick the record carrying the highest version
fn latest_record(versions: Vec<PackageVersion>) -> Option<PackageVersion> {
    let latest = resolve_latest(versions.iter().map(|v| v.version.as_str()))?.to_string();
    versions.into_iter().find(|v| v.version == latest)
}

/// SHA256 checksum of artifact bytes
fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{:x}", hasher.finalize())
}
