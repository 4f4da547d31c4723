mod cache;
mod ollama;
mod openai;
mod rate_limit;
mod retry;

use std::sync::Arc;
use std::time::Duration;

pub use cache::SummaryCache;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use rate_limit::RateLimiter;

use crate::config::AppConfig;
use crate::error::BackendError;
use crate::{Error, Result};

/// Shared system instruction. Both backends use the same prompt so callers
/// see a uniform summary style regardless of which backend served them.
pub(crate) fn system_prompt(language: &str) -> String {
    format!(
        "You are a helpful assistant that summarizes web pages. \
Write a concise summary of the provided text in 3-5 sentences, \
in {language}, regardless of the language of the text. \
Focus on the key points and skip navigation or boilerplate fragments."
    )
}

/// A summarization backend: one external generative-model service plus its
/// local retry policy.
#[async_trait::async_trait]
pub trait SummaryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce a summary or a terminal error after the backend's own retry
    /// policy has run to completion.
    async fn summarize(&self, text: &str) -> std::result::Result<String, BackendError>;
}

/// Orchestrates summarization across the cache and both backends: cache
/// lookup, rate-limited primary attempt, fallback to the secondary on any
/// primary failure, cache population on success.
pub struct Summarizer {
    cache: SummaryCache,
    primary: Arc<dyn SummaryBackend>,
    secondary: Arc<dyn SummaryBackend>,
}

impl Summarizer {
    /// Wire the real backend pair from configuration. Fails when the primary
    /// backend cannot be constructed (missing API key).
    pub fn new(config: &AppConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.openai.rate_limit_requests,
            Duration::from_secs(config.openai.rate_limit_window_secs),
        ));

        let primary = Arc::new(OpenAiBackend::new(config, limiter)?);
        let secondary = Arc::new(OllamaBackend::new(config)?);

        Ok(Self::with_backends(config, primary, secondary))
    }

    /// Compose from explicit backends. Tests inject stubs here.
    pub fn with_backends(
        config: &AppConfig,
        primary: Arc<dyn SummaryBackend>,
        secondary: Arc<dyn SummaryBackend>,
    ) -> Self {
        Self {
            cache: SummaryCache::new(
                config.cache.capacity,
                Duration::from_secs(config.cache.ttl_secs),
            ),
            primary,
            secondary,
        }
    }

    /// Summarize `text`, serving from the cache when possible. Fails only
    /// when both backends are exhausted; the error carries both causes.
    ///
    /// A call that enters a retry loop runs to completion. Callers that need
    /// a deadline should wrap this in `tokio::time::timeout`.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if let Some(summary) = self.cache.lookup(text) {
            tracing::debug!("Cache hit, skipping backends");
            return Ok(summary);
        }

        let primary_err = match self.primary.summarize(text).await {
            Ok(summary) => {
                self.cache.store(text, &summary);
                return Ok(summary);
            }
            Err(err) => err,
        };

        tracing::warn!(
            "{} failed ({}), falling back to {}",
            self.primary.name(),
            primary_err,
            self.secondary.name()
        );

        match self.secondary.summarize(text).await {
            Ok(summary) => {
                // A repeated request is then served locally even while the
                // primary stays down.
                self.cache.store(text, &summary);
                Ok(summary)
            }
            Err(secondary_err) => Err(Error::BackendsExhausted {
                primary_name: self.primary.name(),
                primary: primary_err,
                secondary_name: self.secondary.name(),
                secondary: secondary_err,
            }),
        }
    }
}
