//! Audit history routes and audit collection bootstrap

use axum::Router;
use mongo_audit::{AuditCollectionBootstrapper, AuditQueryService, MongoAuditStore, handlers};
use tracing::info;

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let store = MongoAuditStore::new(&state.db);
    handlers::router(AuditQueryService::new(store, state.audit_registry.clone()))
}

/// Create missing audit collections and their indexes. Skipped entirely
/// while auditing is disabled.
pub async fn bootstrap(state: &AppState) -> eyre::Result<()> {
    if !state.config.audit.enabled {
        info!("MongoDB auditing disabled, skipping audit collection bootstrap");
        return Ok(());
    }

    let store = MongoAuditStore::new(&state.db);
    let report = AuditCollectionBootstrapper::new(store, state.audit_registry.clone())
        .run()
        .await?;

    info!(
        created = report.created.len(),
        existing = report.existing.len(),
        "Audit collections ready"
    );
    Ok(())
}
