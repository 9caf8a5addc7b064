use crate::error::AuditResult;
use crate::registry::AuditRegistry;
use crate::store::{AuditIndex, AuditStore};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

/// Ensures every registered audit collection and its indexes exist.
pub struct AuditCollectionBootstrapper<S: AuditStore> {
    store: S,
    registry: Arc<AuditRegistry>,
}

impl<S: AuditStore> AuditCollectionBootstrapper<S> {
    pub fn new(store: S, registry: Arc<AuditRegistry>) -> Self {
        Self { store, registry }
    }

    /// Safe to run on every startup: index creation with unchanged
    /// definitions is a no-op on the server.
    #[instrument(skip(self), fields(collections = self.registry.len()))]
    pub async fn run(&self) -> AuditResult<BootstrapReport> {
        let mut report = BootstrapReport::default();
        let indexes = AuditIndex::defaults();

        let mut audit_collections: Vec<&str> = self
            .registry
            .iter()
            .map(|(_, metadata)| metadata.audit_collection.as_str())
            .collect();
        audit_collections.sort_unstable();

        for name in audit_collections {
            if self.store.collection_exists(name).await? {
                report.existing.push(name.to_string());
            } else {
                self.store.create_collection(name).await?;
                info!(audit_collection = %name, "Created audit collection");
                report.created.push(name.to_string());
            }

            self.store.ensure_indexes(name, &indexes).await?;
        }

        Ok(report)
    }
}
