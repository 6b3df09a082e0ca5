//! Install, latest-version resolution, and download accounting tests

#![allow(clippy::all, clippy::unwrap_used, clippy::expect_used)]

use modreg::{
    InMemoryMetadataStore, LocalBlobStorage, PackageIndex, PublishRequest, Publisher,
    RegistryConfig, RegistryError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn test_index(temp_dir: &TempDir) -> PackageIndex {
    let store = Arc::new(InMemoryMetadataStore::new());
    let storage = Arc::new(LocalBlobStorage::new(temp_dir.path().to_path_buf()));
    PackageIndex::new(RegistryConfig::default(), store, storage)
}

fn request(name: &str, version: &str, data: &[u8]) -> PublishRequest {
    PublishRequest {
        name: name.to_string(),
        version: version.to_string(),
        description: "a test package".to_string(),
        dependencies: Vec::new(),
        original_filename: format!("{}-{}.zip", name, version),
        data: data.to_vec(),
    }
}

#[tokio::test]
async fn test_published_bytes_round_trip_through_install() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);

    index
        .publish(
            &Publisher::named("alice"),
            request("pkg", "1.0.0", b"the actual artifact"),
        )
        .await
        .unwrap();

    let key = index.install("pkg", Some("1.0.0")).await.unwrap();
    let bytes = index.storage().download(&key).await.unwrap();
    assert_eq!(bytes, b"the actual artifact");
}

#[tokio::test]
async fn test_install_without_version_resolves_latest() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);
    let alice = Publisher::named("alice");

    for version in ["1.2.0", "1.9.0", "1.10.0"] {
        index
            .publish(&alice, request("pkg", version, version.as_bytes()))
            .await
            .unwrap();
    }

    // Numeric component ordering, not string ordering.
    let latest = index.resolve("pkg", None).await.unwrap();
    assert_eq!(latest.version, "1.10.0");

    let key = index.install("pkg", None).await.unwrap();
    let bytes = index.storage().download(&key).await.unwrap();
    assert_eq!(bytes, b"1.10.0");
}

#[tokio::test]
async fn test_download_count_tracks_successful_installs_only() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);

    index
        .publish(&Publisher::named("alice"), request("pkg", "1.0.0", b"x"))
        .await
        .unwrap();

    assert_eq!(index.resolve("pkg", None).await.unwrap().downloads, 0);

    for _ in 0..3 {
        index.install("pkg", Some("1.0.0")).await.unwrap();
    }
    assert_eq!(index.resolve("pkg", None).await.unwrap().downloads, 3);

    // A miss is not an install.
    let err = index.install("pkg", Some("9.9.9")).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    assert_eq!(index.resolve("pkg", None).await.unwrap().downloads, 3);
}

#[tokio::test]
async fn test_versions_count_independently() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);
    let alice = Publisher::named("alice");

    index.publish(&alice, request("pkg", "1.0.0", b"a")).await.unwrap();
    index.publish(&alice, request("pkg", "1.1.0", b"b")).await.unwrap();

    index.install("pkg", Some("1.0.0")).await.unwrap();
    index.install("pkg", Some("1.0.0")).await.unwrap();
    index.install("pkg", Some("1.1.0")).await.unwrap();

    assert_eq!(index.resolve("pkg", Some("1.0.0")).await.unwrap().downloads, 2);
    assert_eq!(index.resolve("pkg", Some("1.1.0")).await.unwrap().downloads, 1);
}

#[tokio::test]
async fn test_list_versions_in_publish_order() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);
    let alice = Publisher::named("alice");

    index.publish(&alice, request("pkg", "1.0.0", b"a")).await.unwrap();
    index.publish(&alice, request("pkg", "1.2.0", b"b")).await.unwrap();

    assert_eq!(index.list_versions("pkg").await.unwrap(), vec!["1.0.0", "1.2.0"]);

    let err = index.list_versions("ghost").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn test_missing_artifact_fails_install_without_counting() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);

    let stored = index
        .publish(&Publisher::named("alice"), request("pkg", "1.0.0", b"x"))
        .await
        .unwrap();

    // Simulate bytes lost behind the registry's back.
    std::fs::remove_file(temp_dir.path().join(&stored.storage_key)).unwrap();

    let err = index.install("pkg", Some("1.0.0")).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    assert_eq!(index.resolve("pkg", None).await.unwrap().downloads, 0);
}

#[tokio::test]
async fn test_resolve_reads_do_not_count() {
    let temp_dir = TempDir::new().unwrap();
    let index = test_index(&temp_dir);

    index
        .publish(&Publisher::named("alice"), request("pkg", "1.0.0", b"x"))
        .await
        .unwrap();

    index.resolve("pkg", None).await.unwrap();
    index.resolve("pkg", Some("1.0.0")).await.unwrap();
    index.list_versions("pkg").await.unwrap();

    assert_eq!(index.resolve("pkg", None).await.unwrap().downloads, 0);
}
