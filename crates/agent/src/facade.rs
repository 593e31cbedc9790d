//! The agent facade.

use std::sync::{Arc, Mutex as StatusLock};
use std::time::Instant;

use chrono::Utc;
use promethios_core::event::{EventObserver, GovernanceEvent};
use promethios_core::intervention::InterventionRecord;
use promethios_core::provider::Usage;
use promethios_core::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, RequestOptions};
use promethios_dispatch::Dispatcher;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::AgentError;
use crate::history::ConversationHistory;
use crate::role::RoleDefinition;

/// Who an agent is and where it sends requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub role: RoleDefinition,
    /// Provider id; `None` uses the registry default.
    pub provider: Option<String>,
    pub is_governed: bool,
}

impl AgentProfile {
    /// A governed agent on the default provider, named after its role.
    pub fn new(id: impl Into<String>, role: RoleDefinition) -> Self {
        Self {
            id: id.into(),
            name: role.name.clone(),
            role,
            provider: None,
            is_governed: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn governed(mut self, is_governed: bool) -> Self {
        self.is_governed = is_governed;
        self
    }
}

/// Lifecycle of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Initialized,
    Idle,
    AwaitingResponse,
    Disposed,
}

/// Per-call adjustments to the request an agent builds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
    pub user_id: Option<String>,
    /// Appended after the role's system prompt.
    pub extra_instructions: Option<String>,
}

/// What an agent returns for one prompt.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub usage: Usage,
    pub interventions: Vec<InterventionRecord>,
    pub attempts: u32,
    pub duration_ms: u64,
}

struct AgentState {
    history: ConversationHistory,
    observer: Option<Arc<dyn EventObserver>>,
}

/// Marks the agent busy for as long as it lives. Dropping it (including when
/// the request future itself is dropped) returns the agent to `Idle`.
struct BusyGuard<'a> {
    status: &'a StatusLock<AgentStatus>,
}

impl<'a> BusyGuard<'a> {
    fn enter(status: &'a StatusLock<AgentStatus>) -> Self {
        *status.lock().unwrap() = AgentStatus::AwaitingResponse;
        Self { status }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut status = self.status.lock().unwrap();
        if *status == AgentStatus::AwaitingResponse {
            *status = AgentStatus::Idle;
        }
    }
}

/// A role-scoped conversational actor over a [`Dispatcher`].
///
/// Calls on the same agent are serialized: the state lock is held for the
/// whole request, so history appends never interleave. The status lives
/// outside that lock and can be read while a request is in flight.
pub struct Agent {
    profile: AgentProfile,
    dispatcher: Arc<Dispatcher>,
    temperature: f32,
    max_tokens: u32,
    status: StatusLock<AgentStatus>,
    state: Mutex<AgentState>,
}

impl Agent {
    pub fn new(profile: AgentProfile, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            profile,
            dispatcher,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            status: StatusLock::new(AgentStatus::Initialized),
            state: Mutex::new(AgentState {
                history: ConversationHistory::default(),
                observer: None,
            }),
        }
    }

    pub fn with_history_cap(self, cap: usize) -> Self {
        let mut state = self.state.into_inner();
        state.history = ConversationHistory::new(cap);
        Self {
            state: Mutex::new(state),
            ..self
        }
    }

    pub fn with_defaults(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_observer(self, observer: Arc<dyn EventObserver>) -> Self {
        let mut state = self.state.into_inner();
        state.observer = Some(observer);
        Self {
            state: Mutex::new(state),
            ..self
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    /// The role's system prompt, before governance.
    pub fn system_prompt(&self) -> String {
        self.profile.role.system_prompt()
    }

    /// Never waits on an in-flight request.
    pub fn status(&self) -> AgentStatus {
        *self.status.lock().unwrap()
    }

    pub async fn history(&self) -> ConversationHistory {
        self.state.lock().await.history.clone()
    }

    pub async fn generate_response(
        &self,
        prompt: &str,
        overrides: Option<RequestOverrides>,
    ) -> Result<AgentReply, AgentError> {
        self.generate_response_with_cancel(prompt, overrides, &CancellationToken::new())
            .await
    }

    /// Send `prompt` with the role's system prompt and the current history.
    ///
    /// History is extended only when the provider answers; a failure leaves
    /// it untouched and is returned to the caller.
    pub async fn generate_response_with_cancel(
        &self,
        prompt: &str,
        overrides: Option<RequestOverrides>,
        cancel: &CancellationToken,
    ) -> Result<AgentReply, AgentError> {
        let mut state = self.state.lock().await;
        if self.status() == AgentStatus::Disposed {
            return Err(AgentError::Disposed(self.profile.id.clone()));
        }

        let busy = BusyGuard::enter(&self.status);
        let options = self.build_options(prompt, &state.history, overrides.unwrap_or_default());
        let start = Instant::now();

        debug!(
            agent_id = %self.profile.id,
            role = %self.profile.role.key,
            history = state.history.len(),
            governed = self.profile.is_governed,
            "Generating response"
        );

        let result = self
            .dispatcher
            .dispatch_with_cancel(
                self.profile.provider.as_deref(),
                options,
                self.profile.is_governed,
                cancel,
            )
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;
        drop(busy);

        match result {
            Ok(outcome) => {
                state.history.push_exchange(prompt, outcome.response.text.clone());
                if let Some(observer) = &state.observer {
                    observer.observe(&GovernanceEvent::AgentResponse {
                        agent_id: self.profile.id.clone(),
                        role: self.profile.role.key.clone(),
                        provider: outcome.provider.clone(),
                        is_governed: self.profile.is_governed,
                        prompt: prompt.to_string(),
                        response: outcome.response.text.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                }
                debug!(
                    agent_id = %self.profile.id,
                    provider = %outcome.provider,
                    interventions = outcome.interventions.len(),
                    duration_ms,
                    "Exchange recorded"
                );
                Ok(AgentReply {
                    text: outcome.response.text,
                    provider: outcome.provider,
                    model: outcome.response.model,
                    usage: outcome.response.usage,
                    interventions: outcome.interventions,
                    attempts: outcome.attempts,
                    duration_ms,
                })
            }
            Err(e) => {
                warn!(agent_id = %self.profile.id, error = %e, "Agent request failed");
                if let Some(observer) = &state.observer {
                    observer.observe(&GovernanceEvent::AgentError {
                        agent_id: self.profile.id.clone(),
                        role: self.profile.role.key.clone(),
                        provider: self.provider_label(),
                        is_governed: self.profile.is_governed,
                        error: e.to_string(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                }
                Err(AgentError::Dispatch(e))
            }
        }
    }

    /// Forget the conversation. Nothing else changes.
    pub async fn reset_conversation(&self) {
        let mut state = self.state.lock().await;
        state.history.clear();
        debug!(agent_id = %self.profile.id, "Conversation reset");
    }

    /// Release the agent. Later calls fail with [`AgentError::Disposed`].
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        state.history.clear();
        state.observer = None;
        *self.status.lock().unwrap() = AgentStatus::Disposed;
        debug!(agent_id = %self.profile.id, "Agent disposed");
    }

    fn build_options(
        &self,
        prompt: &str,
        history: &ConversationHistory,
        overrides: RequestOverrides,
    ) -> RequestOptions {
        let prompt = if history.is_empty() {
            self.profile.role.frame_first_prompt(prompt)
        } else {
            prompt.to_string()
        };

        let mut options = RequestOptions::new(prompt)
            .with_system_prompt(self.profile.role.system_prompt())
            .with_history(history.to_vec())
            .with_temperature(overrides.temperature.unwrap_or(self.temperature))
            .with_max_tokens(overrides.max_tokens.unwrap_or(self.max_tokens))
            .with_agent(self.profile.id.clone())
            .with_role(self.profile.role.key.clone());

        if let Some(extra) = overrides.extra_instructions {
            options = options.with_appended_system_prompt(&extra);
        }
        if let Some(model) = overrides.model {
            options = options.with_model(model);
        }
        if let Some(user_id) = overrides.user_id {
            options = options.with_user(user_id);
        }
        options
    }

    fn provider_label(&self) -> String {
        self.profile
            .provider
            .clone()
            .or_else(|| self.dispatcher.registry().default_id())
            .unwrap_or_else(|| "unknown".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingProvider, dispatcher_for};
    use promethios_core::error::ProviderError;
    use promethios_core::event::EventBus;
    use promethios_core::message::Role;
    use promethios_dispatch::DispatchError;
    use promethios_governance::GovernancePipeline;
    use std::time::Duration;

    fn hr_agent(provider: Arc<RecordingProvider>) -> Agent {
        Agent::new(
            AgentProfile::new("hr-1", RoleDefinition::hr_specialist()),
            dispatcher_for(provider),
        )
    }

    #[tokio::test]
    async fn successful_calls_grow_history_in_pairs() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let agent = hr_agent(provider.clone()).with_history_cap(4);

        for n in 1..=5u32 {
            agent.generate_response(&format!("q{n}"), None).await.unwrap();
            let history = agent.history().await;
            assert_eq!(history.len(), (2 * n as usize).min(4));
        }

        let history = agent.history().await;
        assert_eq!(history.messages()[0].content, "q4");
        assert_eq!(history.messages()[0].role, Role::User);
        assert_eq!(agent.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn first_turn_marker_only_on_fresh_conversation() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let agent = hr_agent(provider.clone());

        agent.generate_response("Hello", None).await.unwrap();
        assert_eq!(provider.last().unwrap().prompt, "[HR consultation] Hello");

        agent.generate_response("Follow-up", None).await.unwrap();
        let second = provider.last().unwrap();
        assert_eq!(second.prompt, "Follow-up");
        assert_eq!(second.conversation_history.len(), 2);
        // history keeps what the user typed
        assert_eq!(second.conversation_history[0].content, "Hello");

        agent.reset_conversation().await;
        agent.generate_response("Again", None).await.unwrap();
        assert_eq!(provider.last().unwrap().prompt, "[HR consultation] Again");
    }

    #[tokio::test]
    async fn request_carries_role_and_overrides() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let agent = hr_agent(provider.clone());

        agent
            .generate_response(
                "Benefits?",
                Some(RequestOverrides {
                    temperature: Some(0.1),
                    model: Some("gpt-4o".into()),
                    user_id: Some("u-7".into()),
                    extra_instructions: Some("Answer in one paragraph.".into()),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        let sent = provider.last().unwrap();
        assert_eq!(sent.role.as_deref(), Some("hr_specialist"));
        assert_eq!(sent.agent_id.as_deref(), Some("hr-1"));
        assert_eq!(sent.user_id.as_deref(), Some("u-7"));
        assert_eq!(sent.model.as_deref(), Some("gpt-4o"));
        assert!((sent.temperature - 0.1).abs() < f32::EPSILON);
        assert!(sent.system_prompt.starts_with("You are an HR specialist."));
        assert!(sent.system_prompt.ends_with("Answer in one paragraph."));
    }

    #[tokio::test]
    async fn failure_leaves_history_unchanged_and_emits_error() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let agent = hr_agent(provider.clone()).with_observer(bus.clone());

        agent.generate_response("first", None).await.unwrap();
        provider.fail_with(ProviderError::AuthenticationFailed("revoked".into()));

        let err = agent.generate_response("second", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Dispatch(DispatchError::Provider { .. })));
        assert_eq!(agent.history().await.len(), 2);

        let ok = rx.recv().await.unwrap();
        assert_eq!(ok.name(), "agent.response");
        let failed = rx.recv().await.unwrap();
        assert!(matches!(
            failed.as_ref(),
            GovernanceEvent::AgentError { agent_id, is_governed: true, .. } if agent_id == "hr-1"
        ));
    }

    #[tokio::test]
    async fn governed_agent_passes_its_role_to_governance() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let registry = Arc::new(promethios_dispatch::ProviderRegistry::new());
        registry.register("mock", provider.clone());
        let dispatcher = Arc::new(
            Dispatcher::new(registry)
                .with_pipeline(Arc::new(GovernancePipeline::with_reference_plugins())),
        );

        let lead = Agent::new(
            AgentProfile::new("lead-1", RoleDefinition::technical_lead()),
            Arc::clone(&dispatcher),
        );
        let reply = lead.generate_response("Shard or not?", None).await.unwrap();
        assert_eq!(reply.interventions.len(), 3);
        let sent = provider.last().unwrap().system_prompt;
        assert!(sent.starts_with("You are a technical lead."));
        assert!(sent.contains("acting strictly as the technical_lead"));

        let raw = Agent::new(
            AgentProfile::new("lead-2", RoleDefinition::technical_lead()).governed(false),
            dispatcher,
        );
        let reply = raw.generate_response("Shard or not?", None).await.unwrap();
        assert!(reply.interventions.is_empty());
        assert_eq!(
            provider.last().unwrap().system_prompt,
            RoleDefinition::technical_lead().system_prompt()
        );
    }

    #[tokio::test]
    async fn disposed_agent_rejects_calls() {
        let provider = Arc::new(RecordingProvider::ok("answer"));
        let agent = hr_agent(provider.clone());
        agent.generate_response("hi", None).await.unwrap();

        agent.dispose().await;
        assert_eq!(agent.status(), AgentStatus::Disposed);
        assert!(agent.history().await.is_empty());

        let err = agent.generate_response("hi again", None).await.unwrap_err();
        assert!(matches!(err, AgentError::Disposed(ref id) if id == "hr-1"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn status_is_observable_while_a_request_is_in_flight() {
        let provider =
            Arc::new(RecordingProvider::ok("answer").with_delay(Duration::from_millis(200)));
        let agent = Arc::new(hr_agent(provider.clone()));
        assert_eq!(agent.status(), AgentStatus::Initialized);

        let pending = {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.generate_response("q1", None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(agent.status(), AgentStatus::AwaitingResponse);

        pending.await.unwrap().unwrap();
        assert_eq!(agent.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn dropped_request_returns_agent_to_idle() {
        let provider =
            Arc::new(RecordingProvider::ok("answer").with_delay(Duration::from_millis(200)));
        let agent = hr_agent(provider.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), agent.generate_response("q", None))
                .await;
        assert!(abandoned.is_err());
        assert_eq!(provider.calls(), 1);
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.history().await.is_empty());

        agent.generate_response("q", None).await.unwrap();
        assert_eq!(agent.history().await.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_calls_on_one_agent_are_serialized() {
        let provider =
            Arc::new(RecordingProvider::ok("answer").with_delay(Duration::from_millis(20)));
        let agent = Arc::new(hr_agent(provider.clone()).with_history_cap(100));

        let mut handles = Vec::new();
        for i in 0..8 {
            let agent = Arc::clone(&agent);
            handles.push(tokio::spawn(async move {
                agent.generate_response(&format!("q{i}"), None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(provider.max_in_flight(), 1);
        let history = agent.history().await;
        assert_eq!(history.len(), 16);
        for pair in history.messages().chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}
