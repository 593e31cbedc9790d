//! The configured set of agents.

use std::collections::BTreeMap;
use std::sync::Arc;

use promethios_config::{AgentConfig, AppConfig};
use promethios_core::event::EventObserver;
use promethios_dispatch::Dispatcher;
use tracing::info;

use crate::AgentError;
use crate::facade::{Agent, AgentProfile};
use crate::role::RoleDefinition;

/// Agents keyed by id.
pub struct AgentRoster {
    agents: BTreeMap<String, Arc<Agent>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
        }
    }

    /// Build every agent in `config.agents`, or one governed agent per
    /// built-in role when none are configured.
    pub fn from_config(
        config: &AppConfig,
        dispatcher: Arc<Dispatcher>,
        observer: Arc<dyn EventObserver>,
    ) -> Result<Self, AgentError> {
        let mut roster = Self::new();

        let profiles = if config.agents.is_empty() {
            RoleDefinition::builtins()
                .into_iter()
                .map(|role| AgentProfile::new(role.key.replace('_', "-"), role))
                .collect()
        } else {
            config
                .agents
                .iter()
                .map(profile_from_config)
                .collect::<Result<Vec<_>, _>>()?
        };

        for profile in profiles {
            let agent = Agent::new(profile, Arc::clone(&dispatcher))
                .with_history_cap(config.history_cap)
                .with_defaults(config.default_temperature, config.default_max_tokens)
                .with_observer(Arc::clone(&observer));
            roster.insert(agent);
        }

        info!(agents = roster.len(), "Agent roster ready");
        Ok(roster)
    }

    pub fn insert(&mut self, agent: Agent) -> Arc<Agent> {
        let agent = Arc::new(agent);
        self.agents.insert(agent.id().to_string(), Arc::clone(&agent));
        agent
    }

    pub fn get(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.get(id).cloned()
    }

    /// Profiles in id order.
    pub fn profiles(&self) -> Vec<&AgentProfile> {
        self.agents.values().map(|a| a.profile()).collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub async fn dispose_all(&self) {
        for agent in self.agents.values() {
            agent.dispose().await;
        }
    }
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_from_config(config: &AgentConfig) -> Result<AgentProfile, AgentError> {
    let role = match (RoleDefinition::builtin(&config.role), &config.system_prompt) {
        (Some(role), Some(prompt)) => role.with_base_prompt(prompt.clone()),
        (Some(role), None) => role,
        (None, Some(prompt)) => {
            RoleDefinition::custom(config.role.clone(), config.role.clone(), prompt.clone())
        }
        (None, None) => {
            return Err(AgentError::UnknownRole {
                agent: config.id.clone(),
                role: config.role.clone(),
            });
        }
    };

    let mut profile = AgentProfile::new(config.id.clone(), role).governed(config.governed);
    if let Some(name) = &config.name {
        profile = profile.with_name(name.clone());
    }
    if let Some(provider) = &config.provider {
        profile = profile.with_provider(provider.clone());
    }
    Ok(profile)
}
