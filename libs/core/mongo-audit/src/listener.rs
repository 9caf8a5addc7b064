use crate::actor::{ActorProvider, TaskLocalActor};
use crate::allocator::RevisionAllocator;
use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::event::WriteEvent;
use crate::record::AuditRecord;
use crate::registry::AuditRegistry;
use crate::store::AuditWriter;
use mongodb::bson::Document;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// Auditing disabled or collection not registered
    Skipped,
    Recorded(AuditRecord),
}

impl AuditOutcome {
    pub fn record(&self) -> Option<&AuditRecord> {
        match self {
            AuditOutcome::Recorded(record) => Some(record),
            AuditOutcome::Skipped => None,
        }
    }
}

/// Receives after-write notifications from repositories and appends audit
/// records for registered collections.
///
/// Must be called inside the write's session, before commit. An error means
/// the enclosing transaction has to be aborted.
#[derive(Clone)]
pub struct AuditEventListener {
    registry: Arc<AuditRegistry>,
    allocator: RevisionAllocator,
    actors: Arc<dyn ActorProvider>,
    enabled: bool,
    without_transaction: bool,
}

impl AuditEventListener {
    pub fn new(registry: Arc<AuditRegistry>, config: &AuditConfig) -> Self {
        Self {
            registry,
            allocator: RevisionAllocator::new(config.without_transaction),
            actors: Arc::new(TaskLocalActor),
            enabled: config.enabled,
            without_transaction: config.without_transaction,
        }
    }

    /// Listener that skips every event.
    pub fn disabled() -> Self {
        Self::new(Arc::new(AuditRegistry::default()), &AuditConfig::default())
    }

    pub fn with_actor_provider(mut self, actors: Arc<dyn ActorProvider>) -> Self {
        self.actors = actors;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether writes may be audited outside a transaction.
    pub fn without_transaction(&self) -> bool {
        self.without_transaction
    }

    pub fn registry(&self) -> &Arc<AuditRegistry> {
        &self.registry
    }

    pub async fn on_after_save<W>(
        &self,
        writer: &mut W,
        collection: &str,
        document: &Document,
    ) -> AuditResult<AuditOutcome>
    where
        W: AuditWriter + ?Sized,
    {
        self.on_event(writer, &WriteEvent::saved(collection, document.clone()))
            .await
    }

    pub async fn on_after_delete<W>(
        &self,
        writer: &mut W,
        collection: &str,
        document: &Document,
    ) -> AuditResult<AuditOutcome>
    where
        W: AuditWriter + ?Sized,
    {
        self.on_event(writer, &WriteEvent::deleted(collection, document.clone()))
            .await
    }

    #[instrument(skip(self, writer, event), fields(collection = %event.collection_name, kind = ?event.kind))]
    pub async fn on_event<W>(&self, writer: &mut W, event: &WriteEvent) -> AuditResult<AuditOutcome>
    where
        W: AuditWriter + ?Sized,
    {
        if !self.enabled {
            debug!("Auditing disabled, skipping");
            return Ok(AuditOutcome::Skipped);
        }

        let Some(metadata) = self.registry.lookup(&event.collection_name) else {
            debug!("Collection not audited, skipping");
            return Ok(AuditOutcome::Skipped);
        };

        let actor = self.actors.actor_or_system();
        let record = self
            .allocator
            .append(writer, event, metadata, &actor)
            .await?;

        Ok(AuditOutcome::Recorded(record))
    }
}
