//! Typed errors for the enrichment library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during enrichment operations.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Retrieval (search or scrape) failed
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Extraction service unavailable or failed
    #[error("extraction service error: {0}")]
    Extraction(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Extraction response did not match the requested schema
    #[error("extraction response did not match schema: {0}")]
    Schema(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Email could not be parsed into a local part and domain
    #[error("invalid email: {email}")]
    InvalidEmail { email: String },
}

/// Errors raised by a `RetrievalGateway`.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Upstream answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Transport-level failure (connection, TLS, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Page was fetched but carried no usable content
    #[error("no content returned for: {url}")]
    EmptyContent { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Gateway misconfigured (missing key, bad base URL)
    #[error("gateway config error: {0}")]
    Config(String),
}

impl RetrievalError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for enrichment operations.
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = RetrievalError::Status {
            status: 503,
            url: "https://acme.io".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "HTTP 503 from https://acme.io");

        let err = RetrievalError::Timeout {
            url: "https://acme.io".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_retrieval_converts_into_enrichment_error() {
        let err: EnrichmentError = RetrievalError::EmptyContent {
            url: "https://acme.io".to_string(),
        }
        .into();
        assert!(matches!(err, EnrichmentError::Retrieval(_)));
    }
}
