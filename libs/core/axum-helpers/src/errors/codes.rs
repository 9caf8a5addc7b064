//! Type-safe error codes for API responses.
//!
//! Each code has a client-facing string (`"VALIDATION_ERROR"`), an integer for
//! logs and dashboards (`1001`) and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::AuditTrailNotConfigured;
//! assert_eq!(code.as_str(), "AUDIT_TRAIL_NOT_CONFIGURED");
//! assert_eq!(code.code(), 1201);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1099)
    ValidationError,
    InvalidUuid,
    JsonExtraction,
    NotFound,
    BadRequest,
    Conflict,
    UnprocessableEntity,
    InvalidQuery,

    // Document store (1100-1199)
    DatabaseError,
    /// Optimistic concurrency check failed; the client should re-read and retry
    VersionConflict,

    // Auditing (1200-1299)
    AuditTrailNotConfigured,
    AuditTransactionRequired,
    AuditRevisionContention,

    // Server errors (1900-1999)
    InternalError,
    ServiceUnavailable,
    IoError,
    SerdeJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::Conflict => "CONFLICT",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::AuditTrailNotConfigured => "AUDIT_TRAIL_NOT_CONFIGURED",
            Self::AuditTransactionRequired => "AUDIT_TRANSACTION_REQUIRED",
            Self::AuditRevisionContention => "AUDIT_REVISION_CONTENTION",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::IoError => "IO_ERROR",
            Self::SerdeJsonError => "SERDE_JSON_ERROR",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::BadRequest => 1005,
            Self::Conflict => 1008,
            Self::UnprocessableEntity => 1009,
            Self::InvalidQuery => 1010,

            Self::DatabaseError => 1101,
            Self::VersionConflict => 1102,

            Self::AuditTrailNotConfigured => 1201,
            Self::AuditTransactionRequired => 1202,
            Self::AuditRevisionContention => 1203,

            Self::InternalError => 1901,
            Self::ServiceUnavailable => 1902,
            Self::IoError => 1903,
            Self::SerdeJsonError => 1904,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::JsonExtraction => "Failed to parse request body",
            Self::NotFound => "Resource not found",
            Self::BadRequest => "Bad request",
            Self::Conflict => "Resource already exists",
            Self::UnprocessableEntity => "Request cannot be processed",
            Self::InvalidQuery => "Invalid query parameters",
            Self::DatabaseError => "Database error occurred",
            Self::VersionConflict => "Resource was modified concurrently",
            Self::AuditTrailNotConfigured => "Audit trail is not configured for this collection",
            Self::AuditTransactionRequired => "Audited writes must run inside a transaction",
            Self::AuditRevisionContention => "Could not allocate an audit revision",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::IoError => "I/O error occurred",
            Self::SerdeJsonError => "JSON serialization error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_string_matches_serde() {
        for code in [
            ErrorCode::ValidationError,
            ErrorCode::VersionConflict,
            ErrorCode::AuditTrailNotConfigured,
            ErrorCode::AuditRevisionContention,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_error_code_ranges() {
        assert_eq!(ErrorCode::ValidationError.code(), 1001);
        assert_eq!(ErrorCode::DatabaseError.code(), 1101);
        assert!((1200..1300).contains(&ErrorCode::AuditTransactionRequired.code()));
    }

    #[test]
    fn test_error_code_deserialization() {
        let code: ErrorCode = serde_json::from_str("\"AUDIT_TRAIL_NOT_CONFIGURED\"").unwrap();
        assert_eq!(code, ErrorCode::AuditTrailNotConfigured);
    }
}
