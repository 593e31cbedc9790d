//! Asks the model to separate what it knows from what it is guessing.

use promethios_core::intervention::Severity;
use promethios_core::request::RequestOptions;

use super::append_once;
use crate::PluginError;
use crate::context::GovernanceContext;
use crate::plugin::{GovernancePlugin, PluginOutcome};

/// Below this trust score the agent is told to verify before asserting.
const LOW_TRUST_THRESHOLD: f64 = 0.5;

pub struct FactualAccuracyPlugin;

impl FactualAccuracyPlugin {
    pub const ID: &'static str = "factual_accuracy";

    pub fn new() -> Self {
        Self
    }

    fn section(trust_score: f64) -> String {
        let mut section = String::from(
            "## Factual Accuracy\n\
             Only state facts you are confident are correct. When you are unsure, say so explicitly \
             rather than guessing. Do not invent names, figures, dates, or citations.",
        );
        if trust_score < LOW_TRUST_THRESHOLD {
            section.push_str(
                "\nThis agent is operating at reduced trust: qualify every factual claim and \
                 recommend that the user verify it independently.",
            );
        }
        section
    }
}

impl Default for FactualAccuracyPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernancePlugin for FactualAccuracyPlugin {
    fn id(&self) -> &str {
        Self::ID
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn summary(&self) -> &str {
        "Requires uncertainty to be stated instead of guessed"
    }

    fn apply(
        &self,
        options: &RequestOptions,
        context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError> {
        Ok(append_once(
            options,
            &Self::section(context.trust_score),
            format!(
                "Applied factual accuracy guidance (trust score {:.2})",
                context.trust_score
            ),
        ))
    }
}
