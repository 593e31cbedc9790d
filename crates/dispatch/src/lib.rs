//! Governed request dispatch.
//!
//! The [`Dispatcher`] resolves a provider from the [`ProviderRegistry`],
//! optionally folds the request through the governance pipeline, and calls
//! the provider with exponential-backoff retry on transport failures.

mod dispatcher;
mod registry;
mod retry;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;

use promethios_core::error::ProviderError;

/// Why a dispatch did not produce a response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request blocked by governance plugin '{plugin}': {reason}")]
    Blocked { plugin: String, reason: String },

    #[error("Provider '{provider}' failed after {attempts} attempt(s): {source}")]
    Provider {
        provider: String,
        attempts: u32,
        source: ProviderError,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// The underlying provider error, if the provider was reached.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider { source, .. } => Some(source),
            _ => None,
        }
    }
}
