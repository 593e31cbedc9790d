//! End-to-end integration tests for Promethios.
//!
//! These tests wire the real stack from configuration (registry, governance
//! pipeline, dispatcher, agent roster) against a mock HTTP provider and
//! check what actually goes over the wire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use promethios_agent::{AgentError, AgentRoster};
use promethios_config::AppConfig;
use promethios_core::error::ProviderError;
use promethios_core::event::{EventBus, GovernanceEvent, NoopObserver};
use promethios_core::intervention::Severity;
use promethios_core::provider::{Provider, ProviderResponse};
use promethios_core::request::RequestOptions;
use promethios_dispatch::{DispatchError, Dispatcher, ProviderRegistry, RetryPolicy};
use promethios_governance::plugins::{RoleEnforcementPlugin, SafetyFilterPlugin};
use promethios_governance::{
    GovernanceContext, GovernancePipeline, GovernancePlugin, PluginError, PluginOutcome,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Helpers ──────────────────────────────────────────────────────────────

fn completion(text: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-test",
        "choices": [{ "message": { "role": "assistant", "content": text } }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24 }
    })
}

fn config_for(server_uri: &str) -> AppConfig {
    AppConfig::from_toml_str(&format!(
        r#"
default_provider = "mock"
api_key = "sk-test"
history_cap = 4

[providers.mock]
api_url = "{server_uri}"
default_model = "gpt-test"

[dispatch]
max_retries = 2
base_delay_ms = 10
max_delay_ms = 100
request_timeout_secs = 5

[[agents]]
id = "lead"
role = "technical-lead"

[[agents]]
id = "ghost"
role = "hr_specialist"
provider = "missing"
"#
    ))
    .unwrap()
}

fn roster_for(config: &AppConfig) -> AgentRoster {
    let dispatcher = Arc::new(Dispatcher::from_config(config));
    AgentRoster::from_config(config, dispatcher, Arc::new(NoopObserver)).unwrap()
}

fn request_json(req: &Request) -> serde_json::Value {
    serde_json::from_slice(&req.body).unwrap()
}

fn system_message(body: &serde_json::Value) -> Option<String> {
    body["messages"]
        .as_array()?
        .iter()
        .find(|m| m["role"] == "system")
        .and_then(|m| m["content"].as_str())
        .map(str::to_string)
}

/// Fails with a transport error `failures` times, then answers.
struct FlakyProvider {
    failures: std::sync::Mutex<u32>,
    calls: std::sync::Mutex<u32>,
}

#[async_trait::async_trait]
impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn complete(&self, _options: &RequestOptions) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ProviderError::Network("connection reset".into()));
        }
        Ok(ProviderResponse::new("ok", "flaky-model"))
    }
}

/// Appends a marker and counts how often it ran.
struct TallyPlugin {
    runs: std::sync::Mutex<u32>,
}

impl GovernancePlugin for TallyPlugin {
    fn id(&self) -> &str {
        "tally"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn apply(
        &self,
        options: &RequestOptions,
        _context: &GovernanceContext,
    ) -> Result<PluginOutcome, PluginError> {
        *self.runs.lock().unwrap() += 1;
        Ok(PluginOutcome::Modified {
            options: options.with_appended_system_prompt("TALLY"),
            description: "tallied".into(),
        })
    }
}

// ── Dispatcher scenarios ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_transient_failures_then_success() {
    let provider = Arc::new(FlakyProvider {
        failures: std::sync::Mutex::new(2),
        calls: std::sync::Mutex::new(0),
    });
    let registry = Arc::new(ProviderRegistry::new());
    registry.register("flaky", provider.clone());
    let dispatcher = Dispatcher::new(registry).with_retry_policy(
        RetryPolicy::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(10)),
    );

    let start = Instant::now();
    let outcome = dispatcher
        .dispatch(None, RequestOptions::new("ping"), false)
        .await
        .unwrap();

    assert_eq!(outcome.response.text, "ok");
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(*provider.calls.lock().unwrap(), 3);
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn e2e_no_provider_registered() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let tally = Arc::new(TallyPlugin {
        runs: std::sync::Mutex::new(0),
    });
    let pipeline = Arc::new(GovernancePipeline::with_reference_plugins());
    pipeline.register(tally.clone());
    let dispatcher = Dispatcher::new(Arc::new(ProviderRegistry::new()))
        .with_pipeline(pipeline)
        .with_observer(bus.clone());

    let err = dispatcher
        .dispatch(None, RequestOptions::new("ping"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ProviderNotFound(_)));
    assert_eq!(*tally.runs.lock().unwrap(), 0);

    let event = rx.recv().await.unwrap();
    assert!(matches!(
        event.as_ref(),
        GovernanceEvent::RequestError { governed: true, .. }
    ));
}

#[test]
fn e2e_role_enforcement_then_safety() {
    let pipeline = GovernancePipeline::new();
    pipeline.register(Arc::new(RoleEnforcementPlugin::for_role("technical-lead")));
    pipeline.register(Arc::new(SafetyFilterPlugin::new()));

    let run = pipeline.run(RequestOptions::new("Review my PR"), &GovernanceContext::default());

    let prompt = &run.options.system_prompt;
    let role_at = prompt.find("technical-lead").unwrap();
    let safety_at = prompt.find(SafetyFilterPlugin::SECTION_HEADER).unwrap();
    assert!(role_at < safety_at);
    assert_eq!(run.interventions.len(), 2);
}

// ── Full stack over HTTP ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_governed_agent_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Use a queue.")))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let roster = roster_for(&config);
    let lead = roster.get("lead").unwrap();

    let reply = lead.generate_response("How do we decouple these services?", None).await.unwrap();
    assert_eq!(reply.text, "Use a queue.");
    assert_eq!(reply.provider, "mock");
    assert_eq!(reply.interventions.len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = request_json(&requests[0]);
    assert_eq!(body["model"], "gpt-test");

    let system = system_message(&body).unwrap();
    assert!(system.starts_with("You are a technical lead."));
    let role_at = system.find("## Role Boundaries").unwrap();
    let accuracy_at = system.find("## Factual Accuracy").unwrap();
    let safety_at = system.find("## Safety Requirements").unwrap();
    assert!(role_at < accuracy_at && accuracy_at < safety_at);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(
        messages.last().unwrap()["content"],
        "[Technical review] How do we decouple these services?"
    );
}

#[tokio::test]
async fn e2e_history_is_capped_and_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ack")))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let roster = roster_for(&config);
    let lead = roster.get("lead").unwrap();

    for i in 0..4 {
        lead.generate_response(&format!("turn {i}"), None).await.unwrap();
    }
    assert_eq!(lead.history().await.len(), 4);

    let requests = server.received_requests().await.unwrap();
    let last = request_json(requests.last().unwrap());
    let roles: Vec<&str> = last["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    // system, two capped exchanges, then this turn
    assert_eq!(roles, ["system", "user", "assistant", "user", "assistant", "user"]);
}

#[tokio::test]
async fn e2e_server_errors_are_retried_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let roster = roster_for(&config);
    let reply = roster
        .get("lead")
        .unwrap()
        .generate_response("status?", None)
        .await
        .unwrap();

    assert_eq!(reply.text, "recovered");
    assert_eq!(reply.attempts, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn e2e_auth_failure_is_not_retried_and_history_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let roster = roster_for(&config);
    let lead = roster.get("lead").unwrap();

    let err = lead.generate_response("hello", None).await.unwrap_err();
    match err {
        AgentError::Dispatch(DispatchError::Provider {
            attempts, source, ..
        }) => {
            assert_eq!(attempts, 1);
            assert!(matches!(source, ProviderError::AuthenticationFailed(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(lead.history().await.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn e2e_agent_with_unknown_provider() {
    let server = MockServer::start().await;
    let config = config_for(&server.uri());
    let roster = roster_for(&config);

    let err = roster
        .get("ghost")
        .unwrap()
        .generate_response("hello", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Dispatch(DispatchError::ProviderNotFound(ref id)) if id == "missing"
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn e2e_disabled_plugins_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("fine")))
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri());
    config.governance.factual_accuracy = false;
    config.governance.safety_filter = false;
    let roster = roster_for(&config);

    let reply = roster
        .get("lead")
        .unwrap()
        .generate_response("hi", None)
        .await
        .unwrap();
    assert_eq!(reply.interventions.len(), 1);
    assert_eq!(reply.interventions[0].kind, "role_enforcement");

    let body = request_json(&server.received_requests().await.unwrap()[0]);
    let system = system_message(&body).unwrap();
    assert!(!system.contains("## Safety Requirements"));
}

#[tokio::test]
async fn e2e_anthropic_provider_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "claude-test",
            "content": [{ "type": "text", "text": "Hi from Claude" }],
            "usage": { "input_tokens": 9, "output_tokens": 3 }
        })))
        .mount(&server)
        .await;

    let config = AppConfig::from_toml_str(&format!(
        r#"
default_provider = "claude"

[providers.claude]
kind = "anthropic"
api_key = "sk-ant-test"
api_url = "{}"
"#,
        server.uri()
    ))
    .unwrap();

    let roster = roster_for(&config);
    let reply = roster
        .get("project-manager")
        .unwrap()
        .generate_response("Plan the launch", None)
        .await
        .unwrap();
    assert_eq!(reply.text, "Hi from Claude");
    assert_eq!(reply.provider, "claude");

    let body = request_json(&server.received_requests().await.unwrap()[0]);
    assert!(body["system"].as_str().unwrap().contains("project_manager"));
}

#[test]
fn e2e_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_provider = "ollama"
history_cap = 6

[governance]
safety_filter = false
default_trust_score = 0.4

[[governance.policies]]
name = "privacy"
description = "Never disclose personal records"
priority = 10
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.history_cap, 6);

    let pipeline = GovernancePipeline::from_config(&config.governance);
    assert_eq!(pipeline.is_enabled("safety_filter"), Some(false));

    let registry = ProviderRegistry::from_config(&config);
    assert_eq!(registry.default_id().as_deref(), Some("ollama"));
}

#[tokio::test]
async fn e2e_health_check_through_configured_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = ProviderRegistry::from_config(&config_for(&server.uri()));
    let provider = registry.get("mock").unwrap();
    assert!(provider.health_check().await.unwrap());
}
