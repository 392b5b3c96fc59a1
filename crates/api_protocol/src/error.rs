//! API error body and codes

use serde::{Deserialize, Serialize};

/// Machine-readable error codes carried in [`ErrorBody::code`].
pub mod error_codes {
    /// Missing or malformed input, or a rejected state transition
    pub const INVALID_REQUEST: &str = "invalid_request";
    /// The request conflicts with the current state
    pub const CONFLICT: &str = "conflict";
    /// Missing, invalid or expired credentials
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    /// Authenticated but not allowed
    pub const PERMISSION_DENIED: &str = "permission_denied";
    /// The requested resource was not found
    pub const NOT_FOUND: &str = "not_found";
    /// A third-party service failed
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    /// A required integration is not configured
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    /// Unexpected server failure
    pub const INTERNAL: &str = "internal";
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub message: String,
    /// One of [`error_codes`]
    pub code: String,
}

impl ErrorBody {
    /// Creates a new error body
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
