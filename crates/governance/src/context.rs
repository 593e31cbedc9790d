//! Governance context — who is asking, how much they are trusted, and which
//! policies apply.
//!
//! Context comes from a pluggable [`GovernanceContextStore`]. Lookups are
//! best-effort: a failing or empty store degrades to configured defaults and
//! never aborts a request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use promethios_config::GovernanceConfig;
use promethios_core::request::RequestOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A policy surfaced to plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDescriptor {
    pub name: String,
    pub description: String,
    /// Higher = more important.
    pub priority: i32,
}

/// Read-only input handed to every plugin for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceContext {
    pub role: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
    /// In `[0.0, 1.0]`.
    pub trust_score: f64,
    pub policies: Vec<PolicyDescriptor>,
}

impl GovernanceContext {
    /// Context carrying only a role, default trust, and no policies.
    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    pub fn with_trust_score(mut self, trust_score: f64) -> Self {
        self.trust_score = trust_score.clamp(0.0, 1.0);
        self
    }

    pub fn with_policies(mut self, policies: Vec<PolicyDescriptor>) -> Self {
        self.policies = policies;
        self
    }

    /// Policies ordered highest priority first; ties keep declaration order.
    pub fn policies_by_priority(&self) -> Vec<&PolicyDescriptor> {
        let mut sorted: Vec<&PolicyDescriptor> = self.policies.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
    }
}

impl Default for GovernanceContext {
    fn default() -> Self {
        Self {
            role: None,
            agent_id: None,
            user_id: None,
            trust_score: 0.75,
            policies: Vec::new(),
        }
    }
}

/// What a store knows about an agent/user pair. Missing fields fall back to
/// [`ContextDefaults`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextRecord {
    pub role: Option<String>,
    pub trust_score: Option<f64>,
    pub policies: Vec<PolicyDescriptor>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ContextStoreError {
    #[error("context store unavailable: {0}")]
    Unavailable(String),

    #[error("context lookup failed: {0}")]
    Lookup(String),
}

/// Source of per-agent governance context.
#[async_trait]
pub trait GovernanceContextStore: Send + Sync {
    async fn lookup(
        &self,
        agent_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Option<ContextRecord>, ContextStoreError>;
}

/// A store that never knows anything.
pub struct NoContextStore;

#[async_trait]
impl GovernanceContextStore for NoContextStore {
    async fn lookup(
        &self,
        _agent_id: Option<&str>,
        _user_id: Option<&str>,
    ) -> Result<Option<ContextRecord>, ContextStoreError> {
        Ok(None)
    }
}

/// In-memory store seeded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticContextStore {
    trust_scores: HashMap<String, f64>,
    roles: HashMap<String, String>,
    policies: Vec<PolicyDescriptor>,
}

impl StaticContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self {
            trust_scores: config.trust_scores.clone(),
            roles: HashMap::new(),
            policies: config
                .policies
                .iter()
                .map(|p| PolicyDescriptor {
                    name: p.name.clone(),
                    description: p.description.clone(),
                    priority: p.priority,
                })
                .collect(),
        }
    }

    pub fn with_trust_score(mut self, agent_id: impl Into<String>, score: f64) -> Self {
        self.trust_scores.insert(agent_id.into(), score);
        self
    }

    pub fn with_role(mut self, agent_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles.insert(agent_id.into(), role.into());
        self
    }

    pub fn with_policy(mut self, policy: PolicyDescriptor) -> Self {
        self.policies.push(policy);
        self
    }
}

#[async_trait]
impl GovernanceContextStore for StaticContextStore {
    async fn lookup(
        &self,
        agent_id: Option<&str>,
        _user_id: Option<&str>,
    ) -> Result<Option<ContextRecord>, ContextStoreError> {
        let trust_score = agent_id.and_then(|id| self.trust_scores.get(id).copied());
        let role = agent_id.and_then(|id| self.roles.get(id).cloned());

        if trust_score.is_none() && role.is_none() && self.policies.is_empty() {
            return Ok(None);
        }

        Ok(Some(ContextRecord {
            role,
            trust_score,
            policies: self.policies.clone(),
        }))
    }
}

/// Fallback values for anything a store does not supply.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDefaults {
    pub trust_score: f64,
    pub policies: Vec<PolicyDescriptor>,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            trust_score: 0.75,
            policies: Vec::new(),
        }
    }
}

impl ContextDefaults {
    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self {
            trust_score: config.default_trust_score,
            policies: Vec::new(),
        }
    }
}

/// Builds a [`GovernanceContext`] for each request.
pub struct ContextResolver {
    store: Arc<dyn GovernanceContextStore>,
    defaults: ContextDefaults,
}

impl ContextResolver {
    pub fn new(store: Arc<dyn GovernanceContextStore>, defaults: ContextDefaults) -> Self {
        Self { store, defaults }
    }

    /// Resolver with no store; every request gets the defaults.
    pub fn defaults_only() -> Self {
        Self::new(Arc::new(NoContextStore), ContextDefaults::default())
    }

    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self::new(
            Arc::new(StaticContextStore::from_config(config)),
            ContextDefaults::from_config(config),
        )
    }

    /// Resolve context for `options`.
    ///
    /// The request's own `role` wins over a stored one. Store errors are
    /// logged and treated as "no record".
    pub async fn resolve(&self, options: &RequestOptions) -> GovernanceContext {
        let agent_id = options.agent_id.as_deref();
        let user_id = options.user_id.as_deref();

        let record = match self.store.lookup(agent_id, user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(agent_id = ?agent_id, error = %e, "Context lookup failed, using defaults");
                None
            }
        }
        .unwrap_or_default();

        let policies = if record.policies.is_empty() {
            self.defaults.policies.clone()
        } else {
            record.policies
        };

        let context = GovernanceContext {
            role: options.role.clone().or(record.role),
            agent_id: options.agent_id.clone(),
            user_id: options.user_id.clone(),
            trust_score: record
                .trust_score
                .unwrap_or(self.defaults.trust_score)
                .clamp(0.0, 1.0),
            policies,
        };

        debug!(
            agent_id = ?context.agent_id,
            role = ?context.role,
            trust_score = context.trust_score,
            policies = context.policies.len(),
            "Resolved governance context"
        );
        context
    }
}
