//! Products API routes

use axum::Router;
use domain_products::{MongoProductRepository, ProductService, handlers};

use crate::state::AppState;

fn repository(state: &AppState) -> MongoProductRepository {
    MongoProductRepository::new(&state.mongo_client, &state.db, state.audit_listener.clone())
}

/// Create products router
pub fn router(state: &AppState) -> Router {
    handlers::router(ProductService::new(repository(state)))
}

/// Initialize products indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    repository(state).init_indexes().await?;
    Ok(())
}
