//! The ordered plugin pipeline.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use promethios_config::GovernanceConfig;
use promethios_core::intervention::{InterventionRecord, Severity};
use promethios_core::request::RequestOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::PluginError;
use crate::context::GovernanceContext;
use crate::plugin::{GovernancePlugin, PluginOutcome};
use crate::plugins::{FactualAccuracyPlugin, RoleEnforcementPlugin, SafetyFilterPlugin};

struct PluginEntry {
    plugin: Arc<dyn GovernancePlugin>,
    enabled: bool,
}

/// Listing row for a registered plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub enabled: bool,
    pub severity: Severity,
    pub summary: String,
}

/// A plugin stopped the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedRequest {
    pub plugin_id: String,
    pub reason: String,
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The governed options; identical to the input when nothing applied.
    pub options: RequestOptions,
    /// One record per plugin that materially changed the request, in
    /// execution order.
    pub interventions: Vec<InterventionRecord>,
    pub blocked: Option<BlockedRequest>,
}

impl PipelineRun {
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }
}

/// Insertion-ordered, independently toggleable governance plugins.
///
/// Thread-safe. Registration and toggling take a write lock; `run`
/// snapshots the enabled plugins and releases the lock before calling any
/// of them.
pub struct GovernancePipeline {
    entries: RwLock<Vec<PluginEntry>>,
}

impl GovernancePipeline {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// The three reference plugins, all enabled.
    pub fn with_reference_plugins() -> Self {
        Self::from_config(&GovernanceConfig::default())
    }

    /// Register the reference plugins with the toggles from `config`.
    pub fn from_config(config: &GovernanceConfig) -> Self {
        let pipeline = Self::new();
        pipeline.register_with_state(Arc::new(RoleEnforcementPlugin::new()), config.role_enforcement);
        pipeline.register_with_state(Arc::new(FactualAccuracyPlugin::new()), config.factual_accuracy);
        pipeline.register_with_state(Arc::new(SafetyFilterPlugin::new()), config.safety_filter);
        pipeline
    }

    /// Register an enabled plugin.
    pub fn register(&self, plugin: Arc<dyn GovernancePlugin>) {
        self.register_with_state(plugin, true);
    }

    /// Register a plugin. Re-registering an id replaces the plugin but keeps
    /// its position.
    pub fn register_with_state(&self, plugin: Arc<dyn GovernancePlugin>, enabled: bool) {
        let id = plugin.id().to_string();
        let mut entries = self.entries.write().unwrap();
        match entries.iter_mut().find(|e| e.plugin.id() == id) {
            Some(existing) => {
                debug!(plugin = %id, "Replacing governance plugin");
                existing.plugin = plugin;
                existing.enabled = enabled;
            }
            None => {
                debug!(plugin = %id, enabled, "Registered governance plugin");
                entries.push(PluginEntry { plugin, enabled });
            }
        }
    }

    /// Remove a plugin. Returns `false` if the id was unknown.
    pub fn unregister(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| e.plugin.id() != id);
        entries.len() != before
    }

    /// Toggle a plugin. Returns `false` if the id was unknown.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut entries = self.entries.write().unwrap();
        match entries.iter_mut().find(|e| e.plugin.id() == id) {
            Some(entry) => {
                entry.enabled = enabled;
                info!(plugin = %id, enabled, "Governance plugin toggled");
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .find(|e| e.plugin.id() == id)
            .map(|e| e.enabled)
    }

    /// All plugins in registration order.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|e| PluginInfo {
                id: e.plugin.id().to_string(),
                enabled: e.enabled,
                severity: e.plugin.severity(),
                summary: e.plugin.summary().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold `options` through every enabled plugin in order.
    ///
    /// Never fails. A plugin that errors, panics, or rewrites anything other
    /// than the tail of the system prompt is skipped and its input passes
    /// through unchanged.
    pub fn run(&self, options: RequestOptions, context: &GovernanceContext) -> PipelineRun {
        let active: Vec<Arc<dyn GovernancePlugin>> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.plugin))
            .collect();

        let mut current = options;
        let mut interventions = Vec::new();

        for plugin in active {
            let id = plugin.id().to_string();
            match Self::apply_guarded(plugin.as_ref(), &current, context) {
                Ok(PluginOutcome::Modified {
                    options: next,
                    description,
                }) => {
                    if next == current {
                        continue;
                    }
                    debug!(plugin = %id, "Governance plugin modified request");
                    interventions.push(InterventionRecord::new(&id, description, plugin.severity()));
                    current = next;
                }
                Ok(PluginOutcome::Unchanged) => {}
                Ok(PluginOutcome::Blocked { reason }) => {
                    warn!(plugin = %id, reason = %reason, "Governance plugin blocked request");
                    interventions.push(InterventionRecord::new(
                        &id,
                        format!("Request blocked: {reason}"),
                        plugin.severity(),
                    ));
                    return PipelineRun {
                        options: current,
                        interventions,
                        blocked: Some(BlockedRequest {
                            plugin_id: id,
                            reason,
                        }),
                    };
                }
                Err(e) => {
                    warn!(plugin = %id, error = %e, "Governance plugin failed, skipping");
                }
            }
        }

        PipelineRun {
            options: current,
            interventions,
            blocked: None,
        }
    }

    fn apply_guarded(
        plugin: &dyn GovernancePlugin,
        options: &RequestOptions,
        context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| plugin.apply(options, context)))
            .map_err(|payload| PluginError::Panicked {
                plugin: plugin.id().to_string(),
                message: panic_message(payload.as_ref()),
            })??;

        if let PluginOutcome::Modified { options: next, .. } = &outcome {
            if !options.is_append_only_change(next) {
                return Err(PluginError::NotAppendOnly {
                    plugin: plugin.id().to_string(),
                });
            }
        }
        Ok(outcome)
    }
}

impl Default for GovernancePipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
