//! Shared test helpers for dispatch tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use promethios_core::error::ProviderError;
use promethios_core::provider::{Provider, ProviderResponse};
use promethios_core::request::RequestOptions;

/// A provider that replays a script of results, then repeats the fallback.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    fallback: Result<ProviderResponse, ProviderError>,
    delay: Option<Duration>,
    calls: Mutex<u32>,
    seen: Mutex<Vec<RequestOptions>>,
}

impl ScriptedProvider {
    pub fn new(
        name: &str,
        script: Vec<Result<ProviderResponse, ProviderError>>,
        fallback: Result<ProviderResponse, ProviderError>,
    ) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(script.into()),
            fallback,
            delay: None,
            calls: Mutex::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok(name: &str, text: &str) -> Self {
        Self::new(name, vec![], Ok(ProviderResponse::new(text, "mock-model")))
    }

    pub fn always_err(name: &str, err: ProviderError) -> Self {
        Self::new(name, vec![], Err(err))
    }

    /// Fail with `err` `failures` times, then succeed with `text`.
    pub fn failing_then_ok(name: &str, failures: usize, err: ProviderError, text: &str) -> Self {
        Self::new(
            name,
            vec![Err(err); failures],
            Ok(ProviderResponse::new(text, "mock-model")),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<RequestOptions> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, options: &RequestOptions) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        self.seen.lock().unwrap().push(options.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
