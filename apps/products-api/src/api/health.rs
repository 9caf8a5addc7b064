//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use database::mongodb::check_health;
use mongodb::Database;
use serde_json::Value;

async fn ready(
    State(db): State<Database>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "mongodb",
        Box::pin(async { check_health(&db).await.map_err(|e| e.to_string()) }),
    )];
    run_health_checks(checks).await
}

/// `/ready`, probing MongoDB
pub fn router(db: Database) -> Router {
    Router::new().route("/ready", get(ready)).with_state(db)
}
