//! Baseline content-safety instructions.

use promethios_core::intervention::Severity;
use promethios_core::request::RequestOptions;

use super::append_once;
use crate::PluginError;
use crate::context::GovernanceContext;
use crate::plugin::{GovernancePlugin, PluginOutcome};

pub struct SafetyFilterPlugin;

impl SafetyFilterPlugin {
    pub const ID: &'static str = "safety_filter";
    pub const SECTION_HEADER: &'static str = "## Safety Requirements";

    pub fn new() -> Self {
        Self
    }

    fn section() -> String {
        format!(
            "{}\n\
             Do not produce harmful, discriminatory, or illegal content. Do not reveal personal or \
             confidential information about individuals. Decline unsafe requests politely and offer \
             a safe alternative where one exists.",
            Self::SECTION_HEADER
        )
    }
}

impl Default for SafetyFilterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl GovernancePlugin for SafetyFilterPlugin {
    fn id(&self) -> &str {
        Self::ID
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn summary(&self) -> &str {
        "Adds baseline content-safety requirements"
    }

    fn apply(
        &self,
        options: &RequestOptions,
        _context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError> {
        Ok(append_once(options, &Self::section(), "Applied safety requirements"))
    }
}
