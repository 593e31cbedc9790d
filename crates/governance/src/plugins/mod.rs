//! Reference governance plugins.
//!
//! Each one appends a fixed-shape section to the system prompt and is
//! idempotent: if its section is already present the request is left alone.

mod factual_accuracy;
mod role_enforcement;
mod safety_filter;

pub use factual_accuracy::FactualAccuracyPlugin;
pub use role_enforcement::RoleEnforcementPlugin;
pub use safety_filter::SafetyFilterPlugin;

use promethios_core::request::RequestOptions;

use crate::plugin::PluginOutcome;

/// Append `section` unless the system prompt already contains it.
pub(crate) fn append_once(
    options: &RequestOptions,
    section: &str,
    description: impl Into<String>,
) -> PluginOutcome {
    if options.system_prompt.contains(section) {
        return PluginOutcome::Unchanged;
    }
    PluginOutcome::Modified {
        options: options.with_appended_system_prompt(section),
        description: description.into(),
    }
}
