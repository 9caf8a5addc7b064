//! API routes module

pub mod audit;
pub mod health;
pub mod products;

use axum::{Router, middleware};
use mongo_audit::actor_middleware;

use crate::state::AppState;

/// Create all API routes. Every request runs with the caller from the
/// `x-actor` header as the audit actor.
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/products", products::router(state))
        .nest("/v1/audit-history", audit::router(state))
        .layer(middleware::from_fn(actor_middleware))
}

/// Prepare collections and indexes before serving
pub async fn init_collections(state: &AppState) -> eyre::Result<()> {
    audit::bootstrap(state).await?;
    products::init_indexes(state).await
}
