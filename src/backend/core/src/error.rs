//! Error handling for the envlink engine.
//!
//! Every precondition violation surfaces a typed error to the caller;
//! the engine never silently recovers. Authorization failures map to
//! [`EngineError::Forbidden`], lifecycle precondition violations to
//! [`EngineError::Conflict`], missing targets to
//! [`EngineError::NotFound`], and malformed input to
//! [`EngineError::Validation`]. Resolving an authenticated actor is the
//! caller's concern, so there is no `Unauthorized` variant here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic
/// error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Forbidden,
    Conflict,
    NotFound,
    ValidationError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::Forbidden => 4001,
            Self::NotFound => 4040,
            Self::Conflict => 4090,
            Self::ValidationError => 4100,
        }
    }

    /// Get the stable string form of this code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Engine Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Typed errors surfaced by engine operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The permission resolver denied the capability, or the scope
    /// calculator excluded the target customer.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A lifecycle precondition was violated: wrong status, duplicate
    /// non-terminal connection, or an already-verified record.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The target id does not resolve to a row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed attributes or an inconsistent actor shape.
    #[error("validation failed: {reason}")]
    Validation { reason: String },
}

impl EngineError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Get the machine-readable code for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation { .. } => ErrorCode::ValidationError,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        assert_eq!(ErrorCode::Forbidden.numeric_code(), 4001);
        assert_eq!(ErrorCode::NotFound.numeric_code(), 4040);
        assert_eq!(ErrorCode::Conflict.numeric_code(), 4090);
        assert_eq!(ErrorCode::ValidationError.numeric_code(), 4100);
    }

    #[test]
    fn test_error_maps_to_code() {
        assert_eq!(
            EngineError::forbidden("no permission").code(),
            ErrorCode::Forbidden
        );
        assert_eq!(
            EngineError::conflict("already processed").code(),
            ErrorCode::Conflict
        );
        assert_eq!(
            EngineError::not_found("connection", "c-1").code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            EngineError::validation("missing customer id").code(),
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_display_includes_reason() {
        let err = EngineError::not_found("stack", "s-42");
        assert_eq!(err.to_string(), "stack not found: s-42");
    }
}
