//! The governed dispatch path.
//!
//! ```text
//! validate ─▶ resolve provider ─▶ [context + pipeline] ─▶ complete (retry) ─▶ event
//! ```
//!
//! The provider is resolved before governance runs, so an unknown id fails
//! without invoking any plugin. Only transport-class errors are retried.

use std::sync::Arc;
use std::time::Instant;

use promethios_config::AppConfig;
use promethios_core::error::ProviderError;
use promethios_core::event::{EventObserver, GovernanceEvent, NoopObserver, TracingObserver};
use promethios_core::intervention::InterventionRecord;
use promethios_core::provider::{Provider, ProviderResponse};
use promethios_core::request::RequestOptions;
use promethios_governance::{ContextResolver, GovernancePipeline};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::DispatchError;
use crate::registry::ProviderRegistry;
use crate::retry::RetryPolicy;

/// A successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub response: ProviderResponse,
    /// Id the provider was resolved under.
    pub provider: String,
    /// Empty for ungoverned requests.
    pub interventions: Vec<InterventionRecord>,
    /// Provider calls made, including the successful one.
    pub attempts: u32,
    pub governed: bool,
    pub duration_ms: u64,
}

/// Routes requests to providers, with optional governance and retry.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    pipeline: Arc<GovernancePipeline>,
    resolver: Arc<ContextResolver>,
    retry: RetryPolicy,
    observer: Arc<dyn EventObserver>,
}

impl Dispatcher {
    /// A dispatcher with an empty pipeline, default retry policy, and no
    /// observer.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            pipeline: Arc::new(GovernancePipeline::new()),
            resolver: Arc::new(ContextResolver::defaults_only()),
            retry: RetryPolicy::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Wire everything from configuration; events go to `tracing`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(ProviderRegistry::from_config(config)))
            .with_pipeline(Arc::new(GovernancePipeline::from_config(&config.governance)))
            .with_context_resolver(Arc::new(ContextResolver::from_config(&config.governance)))
            .with_retry_policy(RetryPolicy::from_config(&config.dispatch))
            .with_observer(Arc::new(TracingObserver))
    }

    pub fn with_pipeline(mut self, pipeline: Arc<GovernancePipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_context_resolver(mut self, resolver: Arc<ContextResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<GovernancePipeline> {
        &self.pipeline
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Dispatch `options` to `provider_id` (or the default provider).
    pub async fn dispatch(
        &self,
        provider_id: Option<&str>,
        options: RequestOptions,
        governed: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch_with_cancel(provider_id, options, governed, &CancellationToken::new())
            .await
    }

    /// As [`dispatch`](Self::dispatch), abandoning the request as soon as
    /// `cancel` fires.
    pub async fn dispatch_with_cancel(
        &self,
        provider_id: Option<&str>,
        options: RequestOptions,
        governed: bool,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let start = Instant::now();
        let result = self
            .dispatch_inner(provider_id, options, governed, cancel, start)
            .await;

        match &result {
            Ok(outcome) => self.observer.observe(&GovernanceEvent::RequestComplete {
                provider: outcome.provider.clone(),
                duration_ms: outcome.duration_ms,
                success: true,
                governed,
                attempts: outcome.attempts,
                interventions: outcome.interventions.clone(),
            }),
            Err(e) => {
                let provider = match e {
                    DispatchError::Provider { provider, .. } => provider.clone(),
                    _ => provider_id
                        .map(str::to_string)
                        .or_else(|| self.registry.default_id())
                        .unwrap_or_else(|| "unknown".into()),
                };
                self.observer.observe(&GovernanceEvent::RequestError {
                    provider,
                    duration_ms: elapsed_ms(start),
                    error: e.to_string(),
                    governed,
                });
            }
        }
        result
    }

    async fn dispatch_inner(
        &self,
        provider_id: Option<&str>,
        options: RequestOptions,
        governed: bool,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<DispatchOutcome, DispatchError> {
        options.validate().map_err(DispatchError::InvalidRequest)?;

        let (provider_name, provider) = self.registry.resolve(provider_id)?;

        let (options, interventions) = if governed {
            let context = self.resolver.resolve(&options).await;
            let run = self.pipeline.run(options, &context);
            if let Some(blocked) = run.blocked {
                return Err(DispatchError::Blocked {
                    plugin: blocked.plugin_id,
                    reason: blocked.reason,
                });
            }
            debug!(
                provider = %provider_name,
                interventions = run.interventions.len(),
                "Governance applied"
            );
            (run.options, run.interventions)
        } else {
            (options, Vec::new())
        };

        let (response, attempts) = self
            .complete_with_retry(&provider_name, provider.as_ref(), &options, cancel)
            .await?;

        let duration_ms = elapsed_ms(start);
        debug!(
            provider = %provider_name,
            governed,
            attempts,
            duration_ms,
            "Dispatch complete"
        );

        Ok(DispatchOutcome {
            response,
            provider: provider_name,
            interventions,
            attempts,
            governed,
            duration_ms,
        })
    }

    async fn complete_with_retry(
        &self,
        provider_name: &str,
        provider: &dyn Provider,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<(ProviderResponse, u32), DispatchError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                r = tokio::time::timeout(self.retry.attempt_timeout, provider.complete(options)) => r,
            };

            let error = match result {
                Ok(Ok(response)) => return Ok((response, attempt)),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{provider_name}' timed out after {}ms",
                    self.retry.attempt_timeout.as_millis()
                )),
            };

            if !error.is_retryable() || attempt > self.retry.max_retries {
                warn!(
                    provider = %provider_name,
                    attempt,
                    retryable = error.is_retryable(),
                    error = %error,
                    "Provider call failed"
                );
                return Err(DispatchError::Provider {
                    provider: provider_name.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.retry.delay_after(attempt - 1, &error);
            warn!(
                provider = %provider_name,
                attempt,
                max_retries = self.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying provider call"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
