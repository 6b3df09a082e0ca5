//! Download accounting

use crate::core::service::{PackageName, RegistryError};
use crate::core::store::MetadataStore;
use std::sync::Arc;
use tracing::debug;

/// Records served installs against the per-version download counter
///
/// Invoked exactly once per successful install, after the artifact has been
/// confirmed retrievable. Failed installs never reach it.
pub struct DownloadAccountant {
    store: Arc<dyn MetadataStore>,
}

impl DownloadAccountant {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Count one served install for the given version
    pub async fn record_install(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<u64, RegistryError> {
        let count = self.store.increment_download(name, version).await?;
        debug!("Download count for {} {} is now {}", name, version, count);
        Ok(count)
    }
}
