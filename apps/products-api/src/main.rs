//! Products API - REST server with audited MongoDB writes

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::Product;
use mongo_audit::{AuditEventListener, AuditRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to MongoDB at {}", config.mongodb.redacted_url());

    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());

    info!(
        "Successfully connected to MongoDB database: {}",
        config.mongodb.database()
    );

    if config.audit.enabled
        && !config.audit.without_transaction
        && !database::mongodb::supports_transactions(&db).await?
    {
        warn!(
            "MongoDB deployment does not support transactions; audited writes will fail. \
             Use a replica set or set MONGODB_AUDIT_WITHOUT_TRANSACTION=true"
        );
    }

    let audit_registry = AuditRegistry::builder()
        .register::<Product>()
        .build(&config.audit)?;
    let audit_listener = Arc::new(AuditEventListener::new(
        audit_registry.clone(),
        &config.audit,
    ));

    let state = AppState {
        config: config.clone(),
        mongo_client,
        db,
        audit_registry,
        audit_listener,
    };

    api::init_collections(&state).await?;

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::health::router(state.db.clone()));

    info!(
        auditing = state.config.audit.enabled,
        "Starting Products API on port {}", state.config.server.port
    );

    let mongo_client = state.mongo_client.clone();
    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            mongo_client.shutdown().await;
            info!("MongoDB connection closed");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Products API shutdown complete");
    Ok(())
}
