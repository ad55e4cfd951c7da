//! Error types for chart list retrieval

use thiserror::Error;

/// Chart source errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration Errors ============
    #[error("Invalid chart list URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid source configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    // ============ Authentication Errors ============
    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ============ Chart List Errors ============
    #[error("No chart list published for {reference} at {url}")]
    ChartListNotFound { reference: String, url: String },

    #[error("Invalid chart list: {message}")]
    InvalidChartList { message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for chart source operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Whether the failure happened on the wire rather than in local input
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RepoError::HttpError { .. }
                | RepoError::NetworkError { .. }
                | RepoError::Timeout { .. }
                | RepoError::RateLimited { .. }
                | RepoError::AuthRequired { .. }
                | RepoError::AuthFailed { .. }
                | RepoError::ChartListNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
