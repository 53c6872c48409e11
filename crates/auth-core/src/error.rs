//! Error taxonomy for the shared auth core.
//!
//! A closed set of error kinds, each carrying a default HTTP status for
//! whatever middleware layer mounts this crate. The core itself never
//! depends on an HTTP crate — `status_code()` returns a bare `u16` so a
//! caller's web framework of choice can project it however it likes.
//! Storage backends (`auth-storage`, `auth-vault`) never leak their own
//! error types across this boundary; they map into `AuthError` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token record {jti} not found")]
    TokenNotFound { jti: String },

    #[error("token {jti} has been revoked")]
    TokenRevoked { jti: String },

    #[error("token {jti} has expired")]
    TokenExpired { jti: String },

    #[error("token validation failed: {reason}")]
    TokenValidationError { reason: String },

    #[error("token service infrastructure fault: {message}")]
    TokenServiceError { message: String },

    #[error("group {name} is unknown or defunct")]
    InvalidGroup { name: String },

    #[error("caller lacks required group {name}")]
    GroupAccessDenied { name: String },

    #[error("fingerprint mismatch")]
    FingerprintMismatch,

    #[error("storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl AuthError {
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        AuthError::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AuthError::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation {
            message: message.into(),
        }
    }

    pub fn token_service(message: impl Into<String>) -> Self {
        AuthError::TokenServiceError {
            message: message.into(),
        }
    }

    /// Default HTTP status for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::TokenNotFound { .. }
            | AuthError::TokenRevoked { .. }
            | AuthError::TokenExpired { .. }
            | AuthError::TokenValidationError { .. }
            | AuthError::FingerprintMismatch => 401,
            AuthError::TokenServiceError { .. } => 500,
            AuthError::InvalidGroup { .. } | AuthError::GroupAccessDenied { .. } => 403,
            AuthError::StorageUnavailable { .. } => 503,
            AuthError::Conflict { .. } => 409,
            AuthError::Validation { .. } => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            AuthError::TokenNotFound { jti: "x".into() }.status_code(),
            401
        );
        assert_eq!(
            AuthError::TokenRevoked { jti: "x".into() }.status_code(),
            401
        );
        assert_eq!(
            AuthError::InvalidGroup { name: "x".into() }.status_code(),
            403
        );
        assert_eq!(AuthError::storage_unavailable("down").status_code(), 503);
        assert_eq!(AuthError::conflict("dup").status_code(), 409);
        assert_eq!(AuthError::validation("bad").status_code(), 400);
        assert_eq!(AuthError::FingerprintMismatch.status_code(), 401);
        assert_eq!(AuthError::token_service("oops").status_code(), 500);
    }
}