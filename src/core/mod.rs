//! Core package index modules

pub mod accountant;
pub mod blob_storage;
pub mod index;
pub mod ownership;
pub mod service;
pub mod storage_key;
pub mod store;
pub mod version;

// Re-export main types for convenience
pub use accountant::DownloadAccountant;
pub use blob_storage::{BlobStorage, LocalBlobStorage, StorageError};
pub use index::{PackageIndex, PublishRequest};
pub use ownership::OwnershipGuard;
pub use service::{PackageName, Publisher, RegistryConfig, RegistryError};
pub use storage_key::locate_for_write;
pub use store::memory::InMemoryMetadataStore;
pub use store::sqlite::SqliteMetadataStore;
pub use store::{MetadataStore, PackageVersion, StoreError};
pub use version::{compare_versions, is_newer, resolve_latest};
