use mongodb::{Database, bson::doc};
use std::time::Instant;

use crate::common::{DatabaseError, DatabaseResult};

/// Outcome of a detailed health probe
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// `ping` the database; used by readiness endpoints.
pub async fn check_health(db: &Database) -> DatabaseResult<()> {
    db.run_command(doc! { "ping": 1 })
        .await
        .map(|_| ())
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))
}

/// [`check_health`] with timing information.
pub async fn check_health_detailed(db: &Database) -> HealthStatus {
    let start = Instant::now();
    let result = check_health(db).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}

/// Whether the deployment can run multi-document transactions.
///
/// Standalone servers cannot; replica set members and `mongos` routers can.
pub async fn supports_transactions(db: &Database) -> DatabaseResult<bool> {
    let hello = db.run_command(doc! { "hello": 1 }).await?;

    let replica_set = hello.get_str("setName").is_ok();
    let router = hello.get_str("msg").map(|m| m == "isdbgrid").unwrap_or(false);

    Ok(replica_set || router)
}
