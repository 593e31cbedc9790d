//! The plugin contract.

use promethios_core::intervention::Severity;
use promethios_core::request::RequestOptions;

use crate::PluginError;
use crate::context::GovernanceContext;

/// What a plugin decided to do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginOutcome {
    /// A new options value with policy text appended to the system prompt.
    Modified {
        options: RequestOptions,
        description: String,
    },
    /// The request must not reach a provider.
    Blocked { reason: String },
    /// Nothing to do for this request.
    Unchanged,
}

/// A single policy unit in a [`GovernancePipeline`](crate::GovernancePipeline).
///
/// `apply` must be a pure function of its inputs. It receives the options by
/// reference and returns a fresh value rather than mutating in place; only
/// appending to `system_prompt` is permitted, and the pipeline rejects any
/// other change.
pub trait GovernancePlugin: Send + Sync {
    /// Unique id within a pipeline; doubles as the intervention `type`.
    fn id(&self) -> &str;

    /// Severity tag attached to this plugin's interventions.
    fn severity(&self) -> Severity;

    /// One-line summary for listings.
    fn summary(&self) -> &str {
        ""
    }

    fn apply(
        &self,
        options: &RequestOptions,
        context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError>;
}
