//! Error types shared across the Promethios domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Provider failures are
//! split into two classes: transport failures (network, timeouts, rate limits,
//! 5xx) that are worth retrying, and request failures (auth, 4xx, bad
//! payloads) that will fail identically on every attempt.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// `retry_after_secs` comes from the vendor's `Retry-After` header.
    #[error("Rate limited by provider{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Only the transport class is retryable. A 4xx `ApiError` is a request
    /// error and is surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_)
            | Self::InvalidRequest(_)
            | Self::ModelNotFound(_)
            | Self::MalformedResponse(_) => false,
        }
    }

    /// How long the provider asked us to wait, if it said.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Map a non-success HTTP status to the matching error class.
    pub fn from_status(status_code: u16, body: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationFailed(body),
            404 => Self::ModelNotFound(body),
            429 => Self::RateLimited {
                retry_after_secs: None,
            },
            400..=499 => Self::InvalidRequest(format!("status {status_code}: {body}")),
            _ => Self::ApiError {
                status_code,
                message: body,
            },
        }
    }
}
