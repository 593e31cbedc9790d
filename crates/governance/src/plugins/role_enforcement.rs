//! Keeps an agent inside its role's remit.

use promethios_core::intervention::Severity;
use promethios_core::request::RequestOptions;

use super::append_once;
use crate::PluginError;
use crate::context::GovernanceContext;
use crate::plugin::{GovernancePlugin, PluginOutcome};

pub struct RoleEnforcementPlugin {
    /// Used when the context carries no role.
    fallback_role: Option<String>,
}

impl RoleEnforcementPlugin {
    pub const ID: &'static str = "role_enforcement";

    pub fn new() -> Self {
        Self {
            fallback_role: None,
        }
    }

    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            fallback_role: Some(role.into()),
        }
    }

    fn section(role: &str, context: &GovernanceContext) -> String {
        let mut section = format!(
            "## Role Boundaries ({role})\n\
             You are acting strictly as the {role}. Stay within the responsibilities of this role.\n\
             If a request falls outside the {role} remit, say so and direct the user to the \
             appropriate specialist instead of answering it yourself."
        );

        let policies = context.policies_by_priority();
        if !policies.is_empty() {
            section.push_str("\n\nActive governance policies:");
            for policy in policies {
                section.push_str(&format!("\n- {}: {}", policy.name, policy.description));
            }
        }
        section
    }
}

impl Default for RoleEnforcementPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernancePlugin for RoleEnforcementPlugin {
    fn id(&self) -> &str {
        Self::ID
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn summary(&self) -> &str {
        "Constrains responses to the acting agent's role"
    }

    fn apply(
        &self,
        options: &RequestOptions,
        context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError> {
        let Some(role) = context.role.as_deref().or(self.fallback_role.as_deref()) else {
            return Ok(PluginOutcome::Unchanged);
        };

        Ok(append_once(
            options,
            &Self::section(role, context),
            format!("Applied role boundaries for '{role}'"),
        ))
    }
}
