use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, ErrorCode};
use mongo_audit::{AuditError, TransientError};
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Product {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: Uuid, expected: i64 },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Nothing to update")]
    EmptyUpdate,

    /// Another transaction wrote the same documents first
    #[error("Product write conflicted with a concurrent transaction: {0}")]
    WriteConflict(String),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::VersionConflict { .. } => AppError::coded(
                StatusCode::CONFLICT,
                ErrorCode::VersionConflict,
                err.to_string(),
            ),
            ProductError::WriteConflict(_) => AppError::coded(
                StatusCode::CONFLICT,
                ErrorCode::VersionConflict,
                err.to_string(),
            ),
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::EmptyUpdate => AppError::BadRequest(err.to_string()),
            ProductError::Audit(audit) => audit.into(),
            ProductError::Database(msg) => AppError::Database(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl TransientError for ProductError {
    fn is_transient(&self) -> bool {
        match self {
            ProductError::WriteConflict(_) => true,
            ProductError::Audit(audit) => audit.is_transient(),
            _ => false,
        }
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
            ProductError::WriteConflict(err.to_string())
        } else {
            ProductError::Database(err.to_string())
        }
    }
}

impl From<mongodb::bson::ser::Error> for ProductError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        ProductError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::now_v7();

        let app: AppError = ProductError::NotFound(id).into();
        assert_eq!(app.status(), StatusCode::NOT_FOUND);

        let app: AppError = ProductError::VersionConflict { id, expected: 2 }.into();
        assert_eq!(app.status(), StatusCode::CONFLICT);

        let app: AppError = ProductError::Audit(AuditError::NoActiveTransaction {
            collection: "products".into(),
        })
        .into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let app: AppError = ProductError::WriteConflict("WriteConflict".into()).into();
        assert_eq!(app.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transient_errors() {
        assert!(ProductError::WriteConflict("WriteConflict".into()).is_transient());
        assert!(
            ProductError::Audit(AuditError::TransientConflict("WriteConflict".into()))
                .is_transient()
        );
        assert!(!ProductError::VersionConflict { id: Uuid::now_v7(), expected: 1 }.is_transient());
        assert!(!ProductError::Audit(AuditError::Database("down".into())).is_transient());
    }
}
