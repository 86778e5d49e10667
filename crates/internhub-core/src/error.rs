//! Error types for InternHub
//!
//! A single [`DomainError`] is shared by every layer. Each variant maps to a
//! stable [`ErrorCode`] that the HTTP layer turns into a status code.

use crate::model::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias used across the workspace
pub type DomainResult<T> = Result<T, DomainError>;

/// Main domain error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Entity does not exist (or is soft-deleted)
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity looked up
        entity: EntityKind,
        /// Requested id
        id: String,
    },

    /// Status change not present in the workflow table
    #[error("illegal {entity} status transition: {from} -> {to}")]
    IllegalTransition {
        /// Workflow owner
        entity: EntityKind,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Cross-entity guard failed
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Input rejected
    #[error("validation failed: {0}")]
    Validation(String),

    /// Uniqueness or concurrent-modification conflict
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Upload exceeds the configured limit
    #[error("payload too large: limit is {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted size
        limit: u64,
    },

    /// Upload content type not accepted
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Blob or snapshot I/O failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Invariant broken inside the service
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Build a not-found error for any displayable id
    #[inline]
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Build a forbidden error
    #[inline]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Build a validation error
    #[inline]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Build a precondition error
    #[inline]
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    /// Build a conflict error
    #[inline]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::IllegalTransition { .. } => ErrorCode::InvalidStatusTransition,
            Self::Precondition(_) => ErrorCode::PreconditionFailed,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            Self::UnsupportedMediaType(_) => ErrorCode::UnsupportedMediaType,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the caller caused the error
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

impl From<std::io::Error> for DomainError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

/// Machine-readable error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidStatusTransition,
    PreconditionFailed,
    ValidationError,
    Conflict,
    Unauthorized,
    Forbidden,
    PayloadTooLarge,
    UnsupportedMediaType,
    StorageError,
    InternalError,
}

impl ErrorCode {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::StorageError => "STORAGE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_serde_names() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::PayloadTooLarge,
            ErrorCode::InternalError,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = DomainError::not_found(EntityKind::Student, "abc");
        assert_eq!(err.to_string(), "student abc not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_errors_are_server_side() {
        let err: DomainError = std::io::Error::other("disk full").into();
        assert_eq!(err.code(), ErrorCode::StorageError);
        assert!(!err.is_client_error());
    }
}
