//! Publish abort tests: a failed, hung, or unconfirmed artifact upload must
//! leave no metadata behind

#![allow(clippy::all, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use modreg::{
    BlobStorage, InMemoryMetadataStore, MetadataStore, PackageIndex, PackageName, PublishRequest,
    Publisher, RegistryConfig, RegistryError, StorageError,
};
use std::sync::Arc;
use std::time::Duration;

/// Storage whose uploads fail outright
struct FailingStorage;

#[async_trait]
impl BlobStorage for FailingStorage {
    async fn upload(&self, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

/// Storage whose uploads never complete
struct HangingStorage;

#[async_trait]
impl BlobStorage for HangingStorage {
    async fn upload(&self, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

/// Storage that accepts uploads but cannot confirm them afterwards
struct VanishingStorage;

#[async_trait]
impl BlobStorage for VanishingStorage {
    async fn upload(&self, _key: &str, _data: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

fn index_over(
    storage: Arc<dyn BlobStorage>,
    config: RegistryConfig,
) -> (PackageIndex, Arc<dyn MetadataStore>) {
    let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let index = PackageIndex::new(config, store.clone(), storage);
    (index, store)
}

fn request() -> PublishRequest {
    PublishRequest {
        name: "pkg".to_string(),
        version: "1.0.0".to_string(),
        description: "a test package".to_string(),
        dependencies: Vec::new(),
        original_filename: "pkg-1.0.0.zip".to_string(),
        data: b"artifact bytes".to_vec(),
    }
}

async fn assert_nothing_registered(store: &Arc<dyn MetadataStore>) {
    let name = PackageName::new("pkg".to_string()).unwrap();
    assert!(store.list_versions(&name).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_upload_registers_no_metadata() {
    let (index, store) = index_over(Arc::new(FailingStorage), RegistryConfig::default());

    let err = index
        .publish(&Publisher::named("alice"), request())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Storage(StorageError::Io(_))));

    assert_nothing_registered(&store).await;
    let err = index.resolve("pkg", None).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn test_timed_out_upload_registers_no_metadata() {
    let config = RegistryConfig {
        storage_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let (index, store) = index_over(Arc::new(HangingStorage), config);

    let err = index
        .publish(&Publisher::named("alice"), request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Storage(StorageError::Timeout(_))
    ));

    assert_nothing_registered(&store).await;
}

#[tokio::test]
async fn test_unconfirmed_upload_registers_no_metadata() {
    let (index, store) = index_over(Arc::new(VanishingStorage), RegistryConfig::default());

    let err = index
        .publish(&Publisher::named("alice"), request())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Storage(StorageError::NotFound(_))
    ));

    assert_nothing_registered(&store).await;
}

#[tokio::test]
async fn test_publish_succeeds_after_storage_recovers() {
    // A rejected publish leaves the name unclaimed in the store, so the
    // retry against healthy storage is a clean first publish rather than a
    // conflict.
    let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let broken = PackageIndex::new(
        RegistryConfig::default(),
        store.clone(),
        Arc::new(FailingStorage),
    );
    broken
        .publish(&Publisher::named("alice"), request())
        .await
        .unwrap_err();

    let temp_dir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(modreg::LocalBlobStorage::new(temp_dir.path().to_path_buf()));
    let healthy = PackageIndex::new(RegistryConfig::default(), store.clone(), storage);

    let stored = healthy
        .publish(&Publisher::named("alice"), request())
        .await
        .unwrap();
    assert_eq!(stored.version, "1.0.0");

    let name = PackageName::new("pkg".to_string()).unwrap();
    assert_eq!(store.list_versions(&name).await.unwrap().len(), 1);
}
