use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};

use super::rate_limit::RateLimiter;
use super::retry::{run_with_backoff, AttemptError};
use super::{system_prompt, SummaryBackend};
use crate::config::AppConfig;
use crate::error::BackendError;
use crate::{Error, Result};

/// Primary summarization backend talking to an OpenAI-compatible endpoint
/// (direct or through a proxy base URL).
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
    base_delay: Duration,
    limiter: Arc<RateLimiter>,
}

impl OpenAiBackend {
    /// Build the client. Fails when no API key is configured; nothing is
    /// retried at construction time.
    pub fn new(config: &AppConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let api_key = config
            .openai
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "OpenAI API key not configured (set OPENAI_API_KEY or [openai] api_key)"
                        .to_string(),
                )
            })?;

        let api_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.openai.base_url.trim_end_matches('/'));

        Ok(Self {
            client: Client::with_config(api_config),
            model: config.openai.model.clone(),
            system_prompt: system_prompt(&config.ai.summary_language),
            max_tokens: config.ai.max_summary_tokens,
            temperature: config.ai.temperature,
            max_retries: config.openai.max_retries,
            base_delay: Duration::from_secs(config.openai.base_delay_secs),
            limiter,
        })
    }

    async fn request_summary(&self, text: &str) -> std::result::Result<String, OpenAIError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(self.system_prompt.as_str())
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()?,
                ),
            ])
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }

    /// Map API failures onto the retry policy: throttling and network errors
    /// are retried, rejected requests are not.
    fn classify(err: OpenAIError) -> AttemptError {
        match err {
            OpenAIError::ApiError(api) => {
                let kind = api.r#type.clone().unwrap_or_default();
                let message = if kind.is_empty() {
                    api.message.clone()
                } else {
                    format!("{} ({})", api.message, kind)
                };

                if kind.contains("rate_limit")
                    || kind == "insufficient_quota"
                    || api.message.to_lowercase().contains("rate limit")
                {
                    AttemptError::RateLimited(message)
                } else if kind == "invalid_request_error" {
                    AttemptError::Fatal(message)
                } else {
                    AttemptError::Transient(message)
                }
            }
            OpenAIError::Reqwest(e) => AttemptError::Transient(e.to_string()),
            OpenAIError::JSONDeserialize(e) => {
                AttemptError::Transient(format!("unreadable response: {}", e))
            }
            other => AttemptError::Fatal(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl SummaryBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn summarize(&self, text: &str) -> std::result::Result<String, BackendError> {
        run_with_backoff("openai", self.max_retries, self.base_delay, |attempt| {
            async move {
                // Every attempt, retries included, goes through the window
                self.limiter.acquire().await;
                tracing::debug!("openai request, attempt {}", attempt + 1);

                match self.request_summary(text).await {
                    Ok(content) => {
                        let summary = content.trim().to_string();
                        if summary.is_empty() {
                            Err(AttemptError::Transient("empty completion".to_string()))
                        } else {
                            Ok(summary)
                        }
                    }
                    Err(err) => Err(Self::classify(err)),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> AppConfig {
        let mut config = AppConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        config
    }

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(10, Duration::from_secs(60)))
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let config = AppConfig::default();
        let result = OpenAiBackend::new(&config, limiter());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_api_key_fails_construction() {
        let mut config = config_with_key();
        config.openai.api_key = Some(String::new());
        assert!(OpenAiBackend::new(&config, limiter()).is_err());
    }

    #[test]
    fn test_construction_with_key() {
        let backend = OpenAiBackend::new(&config_with_key(), limiter()).unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model, "gpt-4o");
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Rate limit reached for requests".to_string(),
            r#type: Some("rate_limit_exceeded".to_string()),
            param: None,
            code: None,
        });
        assert!(matches!(
            OpenAiBackend::classify(err),
            AttemptError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_invalid_request_is_fatal() {
        let err = OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Unsupported parameter".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        });
        assert!(matches!(
            OpenAiBackend::classify(err),
            AttemptError::Fatal(_)
        ));
    }

    #[test]
    fn test_classify_server_error_is_transient() {
        let err = OpenAIError::ApiError(async_openai::error::ApiError {
            message: "The server had an error".to_string(),
            r#type: Some("server_error".to_string()),
            param: None,
            code: None,
        });
        assert!(matches!(
            OpenAiBackend::classify(err),
            AttemptError::Transient(_)
        ));
    }

    #[test]
    fn test_system_prompt_carries_language() {
        let mut config = config_with_key();
        config.ai.summary_language = "Russian".to_string();
        let backend = OpenAiBackend::new(&config, limiter()).unwrap();
        assert!(backend.system_prompt.contains("Russian"));
        assert!(backend.system_prompt.contains("3-5 sentences"));
    }
}
