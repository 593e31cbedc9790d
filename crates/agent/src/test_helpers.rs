//! Shared test helpers for agent tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use promethios_core::error::ProviderError;
use promethios_core::provider::{Provider, ProviderResponse};
use promethios_core::request::RequestOptions;
use promethios_dispatch::{Dispatcher, ProviderRegistry, RetryPolicy};

/// Records every request and answers with a fixed reply until told to fail.
pub struct RecordingProvider {
    reply: Mutex<Result<ProviderResponse, ProviderError>>,
    delay: Option<Duration>,
    seen: Mutex<Vec<RequestOptions>>,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl RecordingProvider {
    pub fn ok(text: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(ProviderResponse::new(text, "mock-model"))),
            delay: None,
            seen: Mutex::new(Vec::new()),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, err: ProviderError) {
        *self.reply.lock().unwrap() = Err(err);
    }

    pub fn last(&self) -> Option<RequestOptions> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, options: &RequestOptions) -> Result<ProviderResponse, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push(options.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

/// A dispatcher with `provider` registered as "mock" and no retries.
pub fn dispatcher_for(provider: Arc<RecordingProvider>) -> Arc<Dispatcher> {
    let registry = Arc::new(ProviderRegistry::new());
    registry.register("mock", provider);
    Arc::new(Dispatcher::new(registry).with_retry_policy(RetryPolicy::none()))
}
