//! Provider registry — named adapters plus a default.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use promethios_config::{AppConfig, ProviderKind};
use promethios_core::provider::Provider;
use promethios_providers::{AnthropicProvider, OpenAiCompatProvider};
use tracing::{debug, info};

use crate::DispatchError;

#[derive(Default)]
struct RegistryState {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_id: Option<String>,
}

/// Maps provider ids to adapters.
///
/// The first registered provider becomes the default unless one is set
/// explicitly. Registering an existing id replaces it.
#[derive(Default)]
pub struct ProviderRegistry {
    state: RwLock<RegistryState>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `id`.
    pub fn register(&self, id: impl Into<String>, provider: Arc<dyn Provider>) {
        let id = id.into();
        let mut state = self.state.write().unwrap();
        if state.default_id.is_none() {
            state.default_id = Some(id.clone());
        }
        if state.providers.insert(id.clone(), provider).is_some() {
            debug!(provider = %id, "Replaced provider");
        } else {
            debug!(provider = %id, "Registered provider");
        }
    }

    /// Make `id` the default. Returns `false` if it is not registered.
    pub fn set_default(&self, id: &str) -> bool {
        let mut state = self.state.write().unwrap();
        if state.providers.contains_key(id) {
            state.default_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn default_id(&self) -> Option<String> {
        self.state.read().unwrap().default_id.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.state.read().unwrap().providers.get(id).cloned()
    }

    /// Look up `id`, or the default when `None`.
    pub fn resolve(&self, id: Option<&str>) -> Result<(String, Arc<dyn Provider>), DispatchError> {
        let state = self.state.read().unwrap();
        let id = match id {
            Some(id) => id.to_string(),
            None => state
                .default_id
                .clone()
                .ok_or_else(|| DispatchError::ProviderNotFound("no default provider".into()))?,
        };
        match state.providers.get(&id) {
            Some(provider) => Ok((id.clone(), Arc::clone(provider))),
            None => Err(DispatchError::ProviderNotFound(id)),
        }
    }

    /// Registered ids, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().unwrap().providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build adapters for every configured provider, plus the default
    /// provider if it was not configured explicitly.
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = Self::new();

        let mut ids: Vec<&String> = config.providers.keys().collect();
        ids.sort();

        for id in ids {
            let provider_config = &config.providers[id];
            let api_key = provider_config
                .api_key
                .clone()
                .or_else(|| config.api_key.clone())
                .unwrap_or_default();
            let model = provider_config
                .default_model
                .clone()
                .unwrap_or_else(|| config.default_model.clone());

            let provider: Arc<dyn Provider> = match provider_config.resolved_kind(id) {
                ProviderKind::Anthropic => {
                    let mut p = AnthropicProvider::new(&api_key).with_name(id.as_str());
                    if let Some(url) = &provider_config.api_url {
                        p = p.with_base_url(url);
                    }
                    if provider_config.default_model.is_some() {
                        p = p.with_default_model(model);
                    }
                    Arc::new(p)
                }
                ProviderKind::OpenaiCompat => {
                    let base_url = provider_config
                        .api_url
                        .clone()
                        .unwrap_or_else(|| default_base_url(id));
                    Arc::new(
                        OpenAiCompatProvider::new(id.as_str(), base_url, &api_key)
                            .with_default_model(model),
                    )
                }
            };

            registry.register(id.clone(), provider);
        }

        if registry.get(&config.default_provider).is_none() {
            let api_key = config.api_key.clone().unwrap_or_default();
            let provider: Arc<dyn Provider> = if config.default_provider == "anthropic" {
                Arc::new(AnthropicProvider::new(&api_key))
            } else {
                Arc::new(
                    OpenAiCompatProvider::new(
                        &config.default_provider,
                        default_base_url(&config.default_provider),
                        &api_key,
                    )
                    .with_default_model(config.default_model.clone()),
                )
            };
            registry.register(config.default_provider.clone(), provider);
        }
        registry.set_default(&config.default_provider);

        info!(
            providers = registry.len(),
            default = %config.default_provider,
            "Provider registry ready"
        );
        registry
    }
}

/// Base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_id: &str) -> String {
    match provider_id {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_id}.api.example.com/v1"),
    }
}
