//! Package metadata store

use crate::core::service::{PackageName, Publisher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod sqlite;

/// Stored metadata for one published package version
///
/// Records are immutable after insertion except for the download counter and
/// the verified flag, which is flipped by an external moderation process
/// writing to the store directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub name: PackageName,
    pub version: String,
    pub author: Publisher,
    pub description: String,
    pub dependencies: Vec<String>,
    pub storage_key: String,
    pub checksum: String,
    pub downloads: u64,
    pub verified: bool,
    pub published_at: DateTime<Utc>,
}

impl PackageVersion {
    /// Build a fresh record for a publish in progress
    pub fn new(
        name: PackageName,
        version: String,
        author: Publisher,
        description: String,
        dependencies: Vec<String>,
        storage_key: String,
        checksum: String,
    ) -> Self {
        Self {
            name,
            version,
            author,
            description,
            dependencies,
            storage_key,
            checksum,
            downloads: 0,
            verified: false,
            published_at: Utc::now(),
        }
    }
}

/// Errors surfaced by metadata store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version already exists: {0}")]
    AlreadyExists(String),

    #[error("Name is owned by another publisher: {0}")]
    OwnerMismatch(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Durable mapping from (name, version) to package-version records
///
/// `insert_if_absent` and `increment_download` are the only operations that
/// need atomicity, and they are where every cross-request invariant
/// (version uniqueness, single ownership, counter integrity) is enforced.
/// Callers never get a check-then-act window across two store calls.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record unless its (name, version) pair already exists
    ///
    /// The duplicate check, the owner check, and the insert happen as one
    /// indivisible operation. Fails with `AlreadyExists` on a duplicate
    /// pair and with `OwnerMismatch` when the record's author differs from
    /// the author of the name's first stored version.
    async fn insert_if_absent(&self, record: PackageVersion)
        -> Result<PackageVersion, StoreError>;

    /// Look up one version of a package
    async fn get_version(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<Option<PackageVersion>, StoreError>;

    /// List all versions of a package in insertion order
    ///
    /// Unknown names yield an empty list, not an error.
    async fn list_versions(&self, name: &PackageName) -> Result<Vec<PackageVersion>, StoreError>;

    /// Atomically bump the download counter, returning the new count
    async fn increment_download(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<u64, StoreError>;
}
