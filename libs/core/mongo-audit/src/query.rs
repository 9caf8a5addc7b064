use crate::error::{AuditError, AuditResult};
use crate::page::{Page, PageRequest};
use crate::record::{AuditRecord, AuditType};
use crate::registry::AuditRegistry;
use crate::store::{AuditFilter, AuditStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

/// Filtered page request over one source collection's audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub collection_name: String,
    pub audit_type: Option<AuditType>,
    pub actor: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub till: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl AuditQuery {
    pub fn for_collection(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    fn filter(&self) -> AuditFilter {
        AuditFilter {
            collection_name: self.collection_name.clone(),
            audit_type: self.audit_type,
            actor: self.actor.clone(),
            from: self.from,
            till: self.till,
        }
    }
}

pub struct AuditQueryService<S: AuditStore> {
    store: S,
    registry: Arc<AuditRegistry>,
}

impl<S: AuditStore> AuditQueryService<S> {
    pub fn new(store: S, registry: Arc<AuditRegistry>) -> Self {
        Self { store, registry }
    }

    /// Returns matching records ordered by revision.
    ///
    /// # Errors
    /// [`AuditError::CollectionNotConfigured`] when `collection_name` is not audited.
    #[instrument(skip(self, query), fields(collection = %query.collection_name))]
    pub async fn query(&self, query: AuditQuery) -> AuditResult<Page<AuditRecord>> {
        let metadata = self
            .registry
            .lookup(&query.collection_name)
            .ok_or_else(|| AuditError::CollectionNotConfigured(query.collection_name.clone()))?;

        let filter = query.filter();
        let total = self.store.count(&metadata.audit_collection, &filter).await?;
        if total == 0 {
            return Ok(Page::empty(query.page));
        }

        let page = query.page.normalize(total);
        let records = self
            .store
            .find(&metadata.audit_collection, &filter, page.offset(), page.limit())
            .await?;

        Ok(Page::new(records, page, total))
    }
}
