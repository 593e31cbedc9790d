//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to translate [`RequestOptions`] into one vendor's wire
//! format, send it, and map the reply back. It has no retry logic of its own;
//! retry, governance and routing belong to the dispatcher.
//!
//! Implementations: OpenAI-compatible, Anthropic Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::request::RequestOptions;

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics (zeroed when the vendor omits them)
    #[serde(default)]
    pub usage: Usage,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
            model: model.into(),
        }
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The dispatcher calls `complete()`
/// without knowing which vendor sits behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, options: &RequestOptions) -> Result<ProviderResponse, ProviderError>;

    /// Whether the provider is reachable with the configured credentials.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
