//! Domain error types
//!
//! All errors are domain-specific and don't expose third-party types:
//! HTTP and storage failures are converted at the adapter boundary.

use thiserror::Error;

/// Main Tidemark error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum TidemarkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Market-data source errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Time-series store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Record validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Market-data source errors
///
/// Errors that occur when talking to the upstream analytics APIs.
/// These don't expose the HTTP client's types.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to reach the upstream endpoint
    #[error("Failed to connect to source: {0}")]
    ConnectionFailed(String),

    /// Credentials rejected (401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited or temporarily unavailable (429/503)
    #[error("Rate limited or unavailable: {0}")]
    RateLimited(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Unexpected client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    /// Whether retrying the request could plausibly succeed
    ///
    /// Authorization rejections are terminal: the same key will be
    /// rejected again. Everything else is transient from the client's
    /// point of view.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SourceError::Unauthorized(_))
    }
}

/// Time-series store errors
///
/// Errors that occur when interacting with InfluxDB.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the store
    #[error("Failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// Token rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to create or update a bucket
    #[error("Bucket setup failed: {0}")]
    BucketSetupFailed(String),

    /// Failed to create the downsampling task
    #[error("Task setup failed: {0}")]
    TaskSetupFailed(String),

    /// Write rejected by the store
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidemark_error_display() {
        let err = TidemarkError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_source_error_conversion() {
        let source_err = SourceError::ConnectionFailed("Network error".to_string());
        let err: TidemarkError = source_err.into();
        assert!(matches!(err, TidemarkError::Source(_)));
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::WriteFailed("bucket missing".to_string());
        let err: TidemarkError = store_err.into();
        assert!(matches!(err, TidemarkError::Store(_)));
    }

    #[test]
    fn test_unauthorized_is_not_retryable() {
        assert!(!SourceError::Unauthorized("status 401".to_string()).is_retryable());
        assert!(SourceError::RateLimited("status 429".to_string()).is_retryable());
        assert!(SourceError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(SourceError::ClientError {
            status: 404,
            message: "Not Found".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = TidemarkError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
        let err = SourceError::Timeout("30s".to_string());
        let _: &dyn std::error::Error = &err;
        let err = StoreError::AuthenticationFailed("bad token".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
