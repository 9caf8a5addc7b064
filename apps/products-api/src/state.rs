//! Application state management

use mongo_audit::{AuditEventListener, AuditRegistry};
use mongodb::{Client, Database};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub mongo_client: Client,
    pub db: Database,
    pub audit_registry: Arc<AuditRegistry>,
    pub audit_listener: Arc<AuditEventListener>,
}
