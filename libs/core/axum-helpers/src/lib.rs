//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! - **[`server`]**: router assembly with OpenAPI UIs, health checks, graceful shutdown
//! - **[`http`]**: cross-cutting middleware
//! - **[`errors`]**: [`AppError`] and the JSON [`ErrorResponse`] body with stable error codes
//! - **[`extractors`]**: UUID path, validated JSON and query extractors
//!
//! ```ignore
//! use axum_helpers::server::{create_router, health_router};
//! use core_config::app_info;
//!
//! let router = create_router::<ApiDoc>(api_routes).await?;
//! let app = router.merge(health_router(app_info!()));
//! ```

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use server::{
    ACTOR_HEADER, HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};

pub use http::security_headers;

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{QueryParams, UuidPath, ValidatedJson};
