//! Role-scoped conversational agents.
//!
//! An [`Agent`] wraps the [`Dispatcher`](promethios_dispatch::Dispatcher)
//! with a fixed role, a bounded conversation history, and an event
//! observer:
//!
//! 1. **Build** request options from the role's system prompt, the history,
//!    and the caller's overrides
//! 2. **Dispatch** to the agent's provider, governed or not
//! 3. **Record** the exchange in history only if the provider answered
//! 4. **Report** an `agent.response` or `agent.error` event
//!
//! Requests on one agent are serialized; different agents run in parallel.

pub mod facade;
pub mod history;
pub mod role;
pub mod roster;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use facade::{Agent, AgentProfile, AgentReply, AgentStatus, RequestOverrides};
pub use history::ConversationHistory;
pub use role::RoleDefinition;
pub use roster::AgentRoster;

use promethios_dispatch::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent '{0}' has been disposed")]
    Disposed(String),

    #[error("Unknown role '{role}' for agent '{agent}' and no system prompt configured")]
    UnknownRole { agent: String, role: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
