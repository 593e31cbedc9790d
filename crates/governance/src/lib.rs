//! Governance pipeline — declarative policy interceptors for LLM requests.
//!
//! A pipeline is an insertion-ordered set of independently toggleable
//! plugins. Each enabled plugin sees the previous plugin's output and may
//! append policy text to the system prompt, leave the request alone, or
//! block it outright.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────────────────────┐    ┌──────────┐
//! │ RequestOpts  │───▶│ role_enforcement ─▶ factual_acc.  │───▶│ Provider │
//! │ + Context    │    │        ─▶ safety_filter ─▶ ...    │    │ adapter  │
//! └──────────────┘    └───────────────────────────────────┘    └──────────┘
//!                                     │
//!                             ┌───────┴────────┐
//!                             │ Interventions  │
//!                             │ (audit trail)  │
//!                             └────────────────┘
//! ```
//!
//! Plugin failures never reach the caller: the pipeline logs them and passes
//! the input through unchanged.

mod context;
mod pipeline;
mod plugin;
pub mod plugins;

pub use context::{
    ContextDefaults, ContextRecord, ContextResolver, ContextStoreError, GovernanceContext,
    GovernanceContextStore, NoContextStore, PolicyDescriptor, StaticContextStore,
};
pub use pipeline::{BlockedRequest, GovernancePipeline, PipelineRun, PluginInfo};
pub use plugin::{GovernancePlugin, PluginOutcome};
pub use promethios_core::intervention::{InterventionRecord, Severity};

/// An internal failure inside a governance plugin.
///
/// Recovered by the pipeline; never surfaced to the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PluginError {
    #[error("plugin '{plugin}' failed: {reason}")]
    Failed { plugin: String, reason: String },

    #[error("plugin '{plugin}' rewrote content it must only append to")]
    NotAppendOnly { plugin: String },

    #[error("plugin '{plugin}' panicked: {message}")]
    Panicked { plugin: String, message: String },
}
