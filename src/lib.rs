//! # Modreg Package Index (Rust Implementation)
//!
//! This crate is the core of the modreg module registry: package naming,
//! version ordering, first-publisher ownership, artifact storage location,
//! and download accounting over a pluggable metadata store.
//!
//! ## Architecture
//!
//! The index provides:
//! - Publish with atomic uniqueness and ownership enforcement
//! - Version resolution (explicit or latest)
//! - Install accounting with per-version download counters
//! - Version listings and metadata lookup
//!
//! Transport, authentication, and raw byte serving are external
//! collaborators: the index is invoked with already-parsed requests and an
//! already-authenticated requester identity, and hands back storage keys
//! instead of streaming bytes itself.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use modreg::{
//!     InMemoryMetadataStore, LocalBlobStorage, PackageIndex, PublishRequest, Publisher,
//!     RegistryConfig,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryMetadataStore::new());
//!     let storage = Arc::new(LocalBlobStorage::new(PathBuf::from("./artifacts")));
//!     let index = PackageIndex::new(RegistryConfig::default(), store, storage);
//!
//!     let record = index
//!         .publish(
//!             &Publisher::named("alice"),
//!             PublishRequest {
//!                 name: "httpclient".to_string(),
//!                 version: "1.0.0".to_string(),
//!                 description: "Minimal HTTP client".to_string(),
//!                 dependencies: vec![],
//!                 original_filename: "httpclient.zip".to_string(),
//!                 data: std::fs::read("./httpclient.zip")?,
//!             },
//!         )
//!         .await?;
//!     println!("Published {} {}", record.name, record.version);
//!
//!     // Resolve the latest version and count an install
//!     let storage_key = index.install("httpclient", None).await?;
//!     let bytes = index.storage().download(&storage_key).await?;
//!     println!("Fetched {} bytes", bytes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod core;

pub use core::accountant::DownloadAccountant;
pub use core::blob_storage::{BlobStorage, LocalBlobStorage, StorageError};
pub use core::index::{PackageIndex, PublishRequest};
pub use core::ownership::OwnershipGuard;
pub use core::service::{PackageName, Publisher, RegistryConfig, RegistryError};
pub use core::storage_key::locate_for_write;
pub use core::store::memory::InMemoryMetadataStore;
pub use core::store::sqlite::SqliteMetadataStore;
pub use core::store::{MetadataStore, PackageVersion, StoreError};
pub use core::version::{compare_versions, is_newer, resolve_latest};

// Re-export commonly used types
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;

/// Version of the package index
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the package index (safe for testing)
pub fn init_logging() {
    // Only initialize logging once
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "modreg=warn".into());

        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

        // This will fail silently if already initialized
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
