//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Groq, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions`.
//!
//! Wire format:
//! - `POST {base_url}/chat/completions` with bearer-token auth
//! - body `{model, messages:[{role,content}], temperature, max_tokens}`
//! - reply `choices[0].message.content` plus a `usage` object

use async_trait::async_trait;
use promethios_core::error::ProviderError;
use promethios_core::provider::{Provider, ProviderResponse, Usage};
use promethios_core::request::RequestOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{status_error, transport_error};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: DEFAULT_MODEL.into(),
            client,
        }
    }

    /// Model used when a request does not name one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// System prompt first, then history oldest-first, then this turn's prompt.
    fn to_api_messages(options: &RequestOptions) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(options.conversation_history.len() + 2);
        if !options.system_prompt.is_empty() {
            messages.push(ApiMessage {
                role: "system".into(),
                content: Some(options.system_prompt.clone()),
            });
        }
        messages.extend(options.conversation_history.iter().map(|m| ApiMessage {
            role: m.role.as_str().into(),
            content: Some(m.content.clone()),
        }));
        messages.push(ApiMessage {
            role: "user".into(),
            content: Some(options.prompt.clone()),
        });
        messages
    }

    fn request_body(&self, options: &RequestOptions) -> serde_json::Value {
        serde_json::json!({
            "model": options.model.as_deref().unwrap_or(&self.default_model),
            "messages": Self::to_api_messages(options),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, options: &RequestOptions) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(options);

        debug!(provider = %self.name, model = %body["model"], "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(&self.name, response).await);
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model,
        })
    }

    /// `GET {base_url}/models`; any 2xx counts as reachable.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
