//! Error types for Signet

use hyper::StatusCode;

/// Main error type for Signet operations
#[derive(Debug, thiserror::Error)]
pub enum SignetError {
    /// Token, case, or document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token past its TTL
    #[error("Expired: {0}")]
    Expired(String),

    /// Mutation attempted on a finalized token
    #[error("Already completed: {0}")]
    AlreadyCompleted(String),

    /// Malformed request payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authorization or ownership mismatch
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// File I/O or encryption failure
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Email or other dependency failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignetError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Expired(_) => StatusCode::GONE,
            Self::AlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is an expected client-facing condition.
    ///
    /// Expected conditions are returned as structured responses and never
    /// logged as alarms. Everything else is a server fault: logged with
    /// full context, surfaced as a generic message.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Expired(_)
                | Self::AlreadyCompleted(_)
                | Self::Validation(_)
                | Self::AccessDenied(_)
        )
    }

    /// Short machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Expired(_) => "EXPIRED",
            Self::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::Upstream(_) => "UPSTREAM_FAILURE",
            Self::Database(_) => "DB_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for SignetError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SignetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for SignetError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for SignetError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SignetError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Result type alias for Signet operations
pub type Result<T> = std::result::Result<T, SignetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            SignetError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SignetError::Expired("x".into()).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            SignetError::AlreadyCompleted("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SignetError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SignetError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_are_not_faults() {
        assert!(SignetError::Expired("x".into()).is_client_error());
        assert!(SignetError::AlreadyCompleted("x".into()).is_client_error());
        assert!(!SignetError::Storage("x".into()).is_client_error());
        assert!(!SignetError::Upstream("x".into()).is_client_error());
    }
}
