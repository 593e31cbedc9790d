//! LLM provider adapters for Promethios.
//!
//! All adapters implement the `promethios_core::Provider` trait and classify
//! failures into retryable transport errors and non-retryable request errors.
//! The dispatcher owns retries; adapters make exactly one HTTP call.

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;

/// Map a `reqwest` send failure onto the transport error class.
pub(crate) fn transport_error(err: reqwest::Error) -> promethios_core::ProviderError {
    if err.is_timeout() {
        promethios_core::ProviderError::Timeout(err.to_string())
    } else {
        promethios_core::ProviderError::Network(err.to_string())
    }
}

/// Turn a non-success response into a [`ProviderError`], keeping any
/// `Retry-After` seconds a 429 carries.
pub(crate) async fn status_error(
    provider: &str,
    response: reqwest::Response,
) -> promethios_core::ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status, body = %body, "Provider returned error");

    match promethios_core::ProviderError::from_status(status, body) {
        promethios_core::ProviderError::RateLimited { .. } => {
            promethios_core::ProviderError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        other => other,
    }
}
