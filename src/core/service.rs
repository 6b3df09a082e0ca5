//! Registry configuration, identities, and error types

use crate::core::store::StoreError;
use std::time::Duration;

/// Package index configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Master switch for publish operations
    pub allow_publishing: bool,

    /// Accept publishes from requesters with no authenticated identity
    pub allow_anonymous_publish: bool,

    /// Upper bound on each artifact storage call
    pub storage_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_publishing: true,
            allow_anonymous_publish: false,
            storage_timeout: Duration::from_secs(30),
        }
    }
}

/// Validated package name
///
/// Names are restricted to ASCII letters and digits so they can be embedded
/// directly into storage keys without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new PackageName with validation
    pub fn new(name: String) -> Result<Self, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidName(
                "Package name cannot be empty".to_string(),
            ));
        }
        if name.len() > 255 {
            return Err(RegistryError::InvalidName(
                "Package name too long (max 255 characters)".to_string(),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RegistryError::InvalidName(
                "Package name contains invalid characters (only ASCII letters and digits allowed)"
                    .to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> String {
        name.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        PackageName::new(s)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for PackageName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PackageName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PackageName::new(s).map_err(serde::de::Error::custom)
    }
}

/// Identity of a publishing or requesting party
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Publisher {
    /// Requester with no authenticated identity
    Anonymous,
    /// Authenticated requester, identified by account name
    ///
    /// Only constructible through [`Publisher::named`], which keeps the
    /// reserved anonymous spelling out of this variant.
    #[non_exhaustive]
    Named(String),
}

impl Publisher {
    /// Identity for an authenticated account
    ///
    /// Empty names and the reserved word "anonymous" fall back to the
    /// anonymous identity so the two spellings cannot diverge.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() || name == "anonymous" {
            Publisher::Anonymous
        } else {
            Publisher::Named(name)
        }
    }

    /// Check whether this is the unauthenticated identity
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Publisher::Anonymous)
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        match self {
            Publisher::Anonymous => "anonymous",
            Publisher::Named(name) => name,
        }
    }
}

impl std::fmt::Display for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for Publisher {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Publisher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Publisher::named(s))
    }
}

/// Registry error taxonomy surfaced to callers
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid package name: {0}")]
    InvalidName(String),

    #[error("Not the package owner: {0}")]
    NotOwner(String),

    #[error("Version is not newer than the latest published: {0}")]
    VersionNotNewer(String),

    #[error("Version already exists: {0}")]
    DuplicateVersion(String),

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Anonymous publishing is not allowed")]
    AnonymousNotAllowed,

    #[error("Publishing is disabled")]
    PublishingDisabled,

    #[error("Storage error: {0}")]
    Storage(#[from] crate::core::blob_storage::StorageError),

    #[error("Metadata store error: {0}")]
    Store(String),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(msg) => RegistryError::DuplicateVersion(msg),
            StoreError::OwnerMismatch(msg) => RegistryError::NotOwner(msg),
            StoreError::NotFound(msg) => RegistryError::NotFound(msg),
            StoreError::Backend(msg) => RegistryError::Store(msg),
        }
    }
}
