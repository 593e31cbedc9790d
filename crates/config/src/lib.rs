//! Configuration loading, validation, and management for Promethios.
//!
//! Loads configuration from `~/.promethios/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promethios/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used when a request names none
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when neither the request nor the provider names one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Maximum conversation turns an agent keeps (user + assistant messages)
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Retry and timeout settings for dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Governance pipeline settings
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Agent roster
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_history_cap() -> usize {
    20
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("history_cap", &self.history_cap)
            .field("providers", &self.providers)
            .field("dispatch", &self.dispatch)
            .field("governance", &self.governance)
            .field("agents", &self.agents)
            .finish()
    }
}

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    Anthropic,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Wire protocol; inferred from the provider id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
}

impl ProviderConfig {
    /// The configured kind, or the one implied by a well-known provider id.
    pub fn resolved_kind(&self, provider_id: &str) -> ProviderKind {
        self.kind.unwrap_or(if provider_id == "anthropic" {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenaiCompat
        })
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Retries after the first failed attempt (transport errors only)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles each attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-attempt timeout for the provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    2
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default = "default_true")]
    pub role_enforcement: bool,

    #[serde(default = "default_true")]
    pub factual_accuracy: bool,

    #[serde(default = "default_true")]
    pub safety_filter: bool,

    /// Trust score used when the context store has nothing for an agent
    #[serde(default = "default_trust_score")]
    pub default_trust_score: f64,

    /// Policies applied to every agent
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,

    /// Per-agent trust scores, keyed by agent id
    #[serde(default)]
    pub trust_scores: HashMap<String, f64>,
}

fn default_trust_score() -> f64 {
    0.75
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            role_enforcement: true,
            factual_accuracy: true,
            safety_filter: true,
            default_trust_score: default_trust_score(),
            policies: vec![],
            trust_scores: HashMap::new(),
        }
    }
}

/// A named governance policy surfaced to agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Higher = listed first
    #[serde(default)]
    pub priority: i32,
}

/// One agent in the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,

    /// Display name; defaults to the role's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Built-in role key (`hr_specialist`, `project_manager`,
    /// `technical_lead`) or a custom key paired with `system_prompt`
    pub role: String,

    /// Provider id; the default provider when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Whether requests go through the governance pipeline
    #[serde(default = "default_true")]
    pub governed: bool,

    /// System prompt for a custom role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.promethios/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PROMETHIOS_API_KEY` (highest priority), `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`
    /// - `PROMETHIOS_PROVIDER`, `PROMETHIOS_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load `path`, then apply the same environment overrides as [`load`](Self::load).
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `PROMETHIOS_*` and vendor key variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("PROMETHIOS_API_KEY")
                .or_else(|| var("OPENAI_API_KEY"))
                .or_else(|| var("ANTHROPIC_API_KEY"));
        }

        if let Some(provider) = var("PROMETHIOS_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("PROMETHIOS_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promethios")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "default_max_tokens must be greater than 0".into(),
            ));
        }

        if self.history_cap < 2 || self.history_cap % 2 != 0 {
            return Err(ConfigError::ValidationError(
                "history_cap must be an even number >= 2".into(),
            ));
        }

        if self.dispatch.base_delay_ms > self.dispatch.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "dispatch.base_delay_ms must not exceed dispatch.max_delay_ms".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.governance.default_trust_score)
            || self
                .governance
                .trust_scores
                .values()
                .any(|s| !(0.0..=1.0).contains(s))
        {
            return Err(ConfigError::ValidationError(
                "trust scores must be between 0.0 and 1.0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            if agent.id.is_empty() {
                return Err(ConfigError::ValidationError("agent id cannot be empty".into()));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            history_cap: default_history_cap(),
            providers: HashMap::new(),
            dispatch: DispatchConfig::default(),
            governance: GovernanceConfig::default(),
            agents: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
