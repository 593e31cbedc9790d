//! Observability events — what the dispatcher and agents report about each
//! request.
//!
//! Producers never log to stdout or reach for a global bus; they are handed an
//! [`EventObserver`] at construction time. Tests subscribe to an [`EventBus`]
//! and assert on the events directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::intervention::InterventionRecord;

/// All observability events in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum GovernanceEvent {
    /// A dispatch finished and the provider returned a response.
    #[serde(rename = "request.complete")]
    RequestComplete {
        provider: String,
        duration_ms: u64,
        success: bool,
        governed: bool,
        attempts: u32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        interventions: Vec<InterventionRecord>,
    },

    /// A dispatch failed (unresolved provider, blocked, exhausted retries...).
    #[serde(rename = "request.error")]
    RequestError {
        provider: String,
        duration_ms: u64,
        error: String,
        governed: bool,
    },

    /// An agent completed a prompt/response exchange.
    #[serde(rename = "agent.response")]
    AgentResponse {
        agent_id: String,
        role: String,
        provider: String,
        is_governed: bool,
        prompt: String,
        response: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An agent's request failed; its history was left untouched.
    #[serde(rename = "agent.error")]
    AgentError {
        agent_id: String,
        role: String,
        provider: String,
        is_governed: bool,
        error: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl GovernanceEvent {
    /// Dotted event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestComplete { .. } => "request.complete",
            Self::RequestError { .. } => "request.error",
            Self::AgentResponse { .. } => "agent.response",
            Self::AgentError { .. } => "agent.error",
        }
    }
}

/// Receives events from dispatchers and agents.
pub trait EventObserver: Send + Sync {
    fn observe(&self, event: &GovernanceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn observe(&self, _event: &GovernanceEvent) {}
}

/// Writes each event as a structured `tracing` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn observe(&self, event: &GovernanceEvent) {
        match event {
            GovernanceEvent::RequestComplete {
                provider,
                duration_ms,
                governed,
                attempts,
                interventions,
                ..
            } => info!(
                event = event.name(),
                provider = %provider,
                duration_ms,
                governed,
                attempts,
                interventions = interventions.len(),
                "Request complete"
            ),
            GovernanceEvent::RequestError {
                provider,
                duration_ms,
                error,
                governed,
            } => warn!(
                event = event.name(),
                provider = %provider,
                duration_ms,
                governed,
                error = %error,
                "Request failed"
            ),
            GovernanceEvent::AgentResponse {
                agent_id,
                role,
                provider,
                is_governed,
                duration_ms,
                ..
            } => info!(
                event = event.name(),
                agent = %agent_id,
                role = %role,
                provider = %provider,
                governed = is_governed,
                duration_ms,
                "Agent responded"
            ),
            GovernanceEvent::AgentError {
                agent_id,
                role,
                error,
                ..
            } => warn!(
                event = event.name(),
                agent = %agent_id,
                role = %role,
                error = %error,
                "Agent request failed"
            ),
        }
    }
}

/// A broadcast-based event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<GovernanceEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: GovernanceEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GovernanceEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventObserver for EventBus {
    fn observe(&self, event: &GovernanceEvent) {
        self.publish(event.clone());
    }
}
