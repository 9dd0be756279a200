//! Errors from the REST requester.

use thiserror::Error;

/// Errors that can occur calling the Discord REST API.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Discord answered with a non-success status.
    #[error("{route} failed with status {status}: {message}")]
    Status {
        /// Route name.
        route: &'static str,
        /// HTTP status code.
        status: u16,
        /// Discord JSON error code, when the body carried one.
        code: Option<u64>,
        /// Error message from the body, or the raw body.
        message: String,
    },

    /// Still rate limited after the configured number of retries.
    #[error("{route} rate limited, retry after {retry_after_ms} ms")]
    RateLimited {
        /// Route name.
        route: &'static str,
        /// Delay Discord asked for on the last attempt.
        retry_after_ms: u64,
    },

    /// Request or response body was not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client construction failed (bad header, proxy or endpoint).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RestError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Json(_) | Self::Config(_) => None,
        }
    }
}

/// Result alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;
