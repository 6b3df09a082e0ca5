//! Publish authorization

use crate::core::service::{PackageName, Publisher, RegistryError};
use crate::core::store::MetadataStore;
use std::sync::Arc;
use tracing::debug;

/// Decides whether a requester may publish under a package name
///
/// The first successful publish fixes the owner; afterwards only that
/// identity may add versions. The metadata store re-checks the same rule
/// atomically at insert time, so this guard is the fail-fast path that
/// rejects a publish before any artifact bytes are written.
pub struct OwnershipGuard {
    store: Arc<dyn MetadataStore>,
    allow_anonymous: bool,
}

impl OwnershipGuard {
    pub fn new(store: Arc<dyn MetadataStore>, allow_anonymous: bool) -> Self {
        Self {
            store,
            allow_anonymous,
        }
    }

    /// Check that `publisher` may publish under `name`
    pub async fn authorize_publish(
        &self,
        name: &PackageName,
        publisher: &Publisher,
    ) -> Result<(), RegistryError> {
        if publisher.is_anonymous() && !self.allow_anonymous {
            return Err(RegistryError::AnonymousNotAllowed);
        }

        let versions = self.store.list_versions(name).await?;
        match versions.first() {
            None => {
                debug!("Name {} is unclaimed, publish allowed for {}", name, publisher);
                Ok(())
            }
            Some(first) if first.author == *publisher => Ok(()),
            Some(first) => Err(RegistryError::NotOwner(format!(
                "{} is owned by {}",
                name, first.author
            ))),
        }
    }
}
