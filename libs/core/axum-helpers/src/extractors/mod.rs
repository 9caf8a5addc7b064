//! Custom extractors for Axum handlers.
//!
//! All of them reject with the crate's JSON [`ErrorResponse`](crate::ErrorResponse).

pub mod query_params;
pub mod uuid_path;
pub mod validated_json;

pub use query_params::QueryParams;
pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
