//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT validation failed.
    #[error("JWT validation failed: {0}")]
    JwtValidation(String),

    /// JWT encoding failed.
    #[error("JWT encoding failed: {0}")]
    JwtEncoding(String),

    /// Token expired.
    #[error("Token expired")]
    TokenExpired,

    /// Invalid token.
    #[error("Invalid token")]
    InvalidToken,

    /// Password hashing or hash parsing failed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidToken
            | jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidToken,
            _ => AuthError::JwtValidation(e.to_string()),
        }
    }
}

impl AuthError {
    /// Returns true if the failure lies with the server rather than with the
    /// credentials the client presented.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AuthError::JwtEncoding(_) | AuthError::PasswordHash(_) | AuthError::Configuration(_)
        )
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_faults() {
        assert!(AuthError::PasswordHash("bad params".to_string()).is_server_fault());
        assert!(!AuthError::TokenExpired.is_server_fault());
        assert!(!AuthError::InvalidToken.is_server_fault());
    }
}
