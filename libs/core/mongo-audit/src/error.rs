use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, ErrorCode};
use core_config::ConfigError;
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Invalid auditing setup detected at startup
    #[error("Invalid audit configuration: {0}")]
    Config(String),

    #[error(
        "No active transaction while MongoDB Auditing. Try updating collection: '{collection}' in a Transaction"
    )]
    NoActiveTransaction { collection: String },

    #[error(
        "Non recoverable Race condition in MongoDB Auditing, while getting next revision number for collection: '{audit_collection}'"
    )]
    NonRecoverableRace { audit_collection: String },

    #[error("Audit collection not found for Source collection: {0}")]
    CollectionNotConfigured(String),

    /// Unique `revision` index rejected an insert. Consumed by the allocator's
    /// retry loop and never surfaced to callers.
    #[error("Revision {revision} already taken in '{audit_collection}'")]
    DuplicateRevision {
        audit_collection: String,
        revision: i64,
    },

    /// The server aborted the surrounding transaction because another one
    /// touched the same documents. The whole transaction may be rerun.
    #[error("Transaction conflict while MongoDB Auditing: {0}")]
    TransientConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    /// True when rerunning the enclosing transaction can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, AuditError::TransientConflict(_))
    }
}

impl From<mongodb::error::Error> for AuditError {
    fn from(err: mongodb::error::Error) -> Self {
        if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
            AuditError::TransientConflict(err.to_string())
        } else {
            AuditError::Database(err.to_string())
        }
    }
}

impl From<mongodb::bson::ser::Error> for AuditError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for AuditError {
    fn from(err: ConfigError) -> Self {
        AuditError::Config(err.to_string())
    }
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::CollectionNotConfigured(_) => AppError::coded(
                StatusCode::BAD_REQUEST,
                ErrorCode::AuditTrailNotConfigured,
                err.to_string(),
            ),
            AuditError::NoActiveTransaction { .. } => AppError::coded(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::AuditTransactionRequired,
                err.to_string(),
            ),
            AuditError::NonRecoverableRace { .. } | AuditError::DuplicateRevision { .. } => {
                AppError::coded(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::AuditRevisionContention,
                    err.to_string(),
                )
            }
            AuditError::TransientConflict(_) => AppError::coded(
                StatusCode::CONFLICT,
                ErrorCode::AuditRevisionContention,
                err.to_string(),
            ),
            AuditError::Database(msg) => AppError::Database(msg),
            AuditError::Config(msg) | AuditError::Serialization(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
