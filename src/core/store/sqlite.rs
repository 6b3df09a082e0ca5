//! SQLite metadata store

use crate::core::service::{PackageName, Publisher};
use crate::core::store::{MetadataStore, PackageVersion, StoreError};
use async_trait::async_trait;
use rusqlite::OptionalExtension;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database schema version
const SCHEMA_VERSION: i32 = 1;

/// Metadata store backed by a SQLite database file
///
/// Every call opens its own connection and runs on the blocking pool, so
/// the store can be shared freely across tasks. Writers serialize at the
/// database: `insert_if_absent` wraps its checks and the insert in one
/// immediate transaction and `increment_download` is a single UPDATE.
pub struct SqliteMetadataStore {
    db_path: PathBuf,
}

impl SqliteMetadataStore {
    /// Open a store at the given path, creating the schema when missing
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("Failed to create database directory: {}", e))
                })?;
            }

            let conn = open_connection(&db_path)?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY
                )",
                [],
            )
            .map_err(|e| StoreError::Backend(format!("Failed to create schema: {}", e)))?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS package_versions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    version TEXT NOT NULL,
                    author TEXT,
                    description TEXT NOT NULL,
                    dependencies_json TEXT NOT NULL,
                    storage_key TEXT NOT NULL,
                    checksum TEXT NOT NULL,
                    downloads INTEGER NOT NULL DEFAULT 0,
                    verified INTEGER NOT NULL DEFAULT 0,
                    published_at TEXT NOT NULL,
                    UNIQUE(name, version)
                )",
                [],
            )
            .map_err(|e| StoreError::Backend(format!("Failed to create schema: {}", e)))?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_package_name ON package_versions(name)",
                [],
            )
            .map_err(|e| StoreError::Backend(format!("Failed to create index: {}", e)))?;

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
                [SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Backend(format!("Failed to record schema version: {}", e)))?;

            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))?
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert_if_absent(
        &self,
        record: PackageVersion,
    ) -> Result<PackageVersion, StoreError> {
        let db_path = self.db_path.clone();
        let dependencies_json = serde_json::to_string(&record.dependencies)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize dependencies: {}", e)))?;
        let stored = record.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = open_connection(&db_path)?;
            let tx = conn
                .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
                .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

            // The first row by insertion order carries the owning identity.
            let owner: Option<Option<String>> = tx
                .query_row(
                    "SELECT author FROM package_versions WHERE name = ? ORDER BY id LIMIT 1",
                    [record.name.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::Backend(format!("Failed to query owner: {}", e)))?;

            if let Some(owner) = owner.map(publisher_from_column) {
                if owner != record.author {
                    return Err(StoreError::OwnerMismatch(format!(
                        "{} is owned by {}",
                        record.name, owner
                    )));
                }
            }

            let duplicate: Option<i64> = tx
                .query_row(
                    "SELECT id FROM package_versions WHERE name = ? AND version = ?",
                    rusqlite::params![record.name.as_str(), record.version],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::Backend(format!("Failed to query version: {}", e)))?;

            if duplicate.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "{} {}",
                    record.name, record.version
                )));
            }

            tx.execute(
                "INSERT INTO package_versions
                    (name, version, author, description, dependencies_json, storage_key,
                     checksum, downloads, verified, published_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    record.name.as_str(),
                    record.version,
                    publisher_to_column(&record.author),
                    record.description,
                    dependencies_json,
                    record.storage_key,
                    record.checksum,
                    record.downloads as i64,
                    record.verified,
                    record.published_at.to_rfc3339(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::AlreadyExists(format!("{} {}", record.name, record.version))
                }
                other => StoreError::Backend(format!("Failed to insert record: {}", other)),
            })?;

            tx.commit()
                .map_err(|e| StoreError::Backend(format!("Failed to commit: {}", e)))?;

            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))??;

        Ok(stored)
    }

    async fn get_version(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<Option<PackageVersion>, StoreError> {
        let db_path = self.db_path.clone();
        let name = name.as_str().to_string();
        let version = version.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            conn.query_row(
                "SELECT name, version, author, description, dependencies_json, storage_key,
                        checksum, downloads, verified, published_at
                 FROM package_versions WHERE name = ? AND version = ?",
                rusqlite::params![name, version],
                row_to_record,
            )
            .optional()
            .map_err(|e| StoreError::Backend(format!("Failed to query record: {}", e)))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))?
    }

    async fn list_versions(&self, name: &PackageName) -> Result<Vec<PackageVersion>, StoreError> {
        let db_path = self.db_path.clone();
        let name = name.as_str().to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let mut stmt = conn
                .prepare(
                    "SELECT name, version, author, description, dependencies_json, storage_key,
                            checksum, downloads, verified, published_at
                     FROM package_versions WHERE name = ? ORDER BY id",
                )
                .map_err(|e| StoreError::Backend(format!("Failed to prepare query: {}", e)))?;

            let records = stmt
                .query_map([name], row_to_record)
                .map_err(|e| StoreError::Backend(format!("Failed to list records: {}", e)))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| StoreError::Backend(format!("Failed to read record: {}", e)))?;

            Ok(records)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))?
    }

    async fn increment_download(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<u64, StoreError> {
        let db_path = self.db_path.clone();
        let name = name.as_str().to_string();
        let version = version.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let count: Option<i64> = conn
                .query_row(
                    "UPDATE package_versions SET downloads = downloads + 1
                     WHERE name = ? AND version = ?
                     RETURNING downloads",
                    rusqlite::params![name, version],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::Backend(format!("Failed to update counter: {}", e)))?;

            count
                .map(|c| c as u64)
                .ok_or_else(|| StoreError::NotFound(format!("{} {}", name, version)))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Database task failed: {}", e)))?
    }
}

fn open_connection(db_path: &Path) -> Result<rusqlite::Connection, StoreError> {
    let conn = rusqlite::Connection::open(db_path)
        .map_err(|e| StoreError::Backend(format!("Failed to open database: {}", e)))?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(|e| StoreError::Backend(format!("Failed to set busy timeout: {}", e)))?;
    Ok(conn)
}

fn publisher_to_column(author: &Publisher) -> Option<String> {
    match author {
        Publisher::Anonymous => None,
        Publisher::Named(name) => Some(name.clone()),
    }
}

fn publisher_from_column(author: Option<String>) -> Publisher {
    match author {
        Some(name) => Publisher::named(name),
        None => Publisher::Anonymous,
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PackageVersion> {
    let name: String = row.get(0)?;
    let version: String = row.get(1)?;
    let author: Option<String> = row.get(2)?;
    let description: String = row.get(3)?;
    let dependencies_json: String = row.get(4)?;
    let storage_key: String = row.get(5)?;
    let checksum: String = row.get(6)?;
    let downloads: i64 = row.get(7)?;
    let verified: bool = row.get(8)?;
    let published_at_str: String = row.get(9)?;

    let name = PackageName::new(name).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let dependencies: Vec<String> = serde_json::from_str(&dependencies_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let published_at = chrono::DateTime::parse_from_rfc3339(&published_at_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&chrono::Utc);

    Ok(PackageVersion {
        name,
        version,
        author: publisher_from_column(author),
        description,
        dependencies,
        storage_key,
        checksum,
        downloads: downloads as u64,
        verified,
        published_at,
    })
}
