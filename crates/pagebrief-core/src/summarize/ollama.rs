use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::{run_with_backoff, AttemptError};
use super::{system_prompt, SummaryBackend};
use crate::config::AppConfig;
use crate::error::BackendError;
use crate::{Error, Result};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Fallback summarization backend talking to a locally-reachable Ollama
/// instance. Not rate-limited; the fallback path carries no window cap.
pub struct OllamaBackend {
    client: Client,
    probe_client: Client,
    base_url: String,
    model: String,
    system_prompt: String,
    num_predict: u32,
    temperature: f32,
    max_retries: u32,
    base_delay: Duration,
}

impl OllamaBackend {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.request_timeout_secs))
            .build()
            .map_err(Error::Http)?;

        // Liveness checks get a much shorter deadline than generation
        let probe_client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.probe_timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            probe_client,
            base_url: config.ollama.base_url.trim_end_matches('/').to_string(),
            model: config.ollama.model.clone(),
            system_prompt: system_prompt(&config.ai.summary_language),
            num_predict: config.ai.max_summary_tokens,
            temperature: config.ai.temperature,
            max_retries: config.ollama.max_retries,
            base_delay: Duration::from_secs(config.ollama.base_delay_secs),
        })
    }

    /// Lightweight status call. A failure here means the instance is down or
    /// unreachable, and the whole backend fails fast without retries.
    async fn probe(&self) -> std::result::Result<(), BackendError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .probe_client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Ollama probe failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable(format!(
                "Ollama probe returned HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn request_summary(&self, text: &str) -> std::result::Result<String, AttemptError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: text,
            system: &self.system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Transient(format!(
                "Ollama returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Transient(format!("Unreadable Ollama response: {}", e)))?;

        let summary = generated.response.trim().to_string();
        if summary.is_empty() {
            return Err(AttemptError::Transient("Empty Ollama response".to_string()));
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl SummaryBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn summarize(&self, text: &str) -> std::result::Result<String, BackendError> {
        self.probe().await?;

        run_with_backoff("ollama", self.max_retries, self.base_delay, |attempt| {
            async move {
                tracing::debug!("ollama request, attempt {}", attempt + 1);
                self.request_summary(text).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut config = AppConfig::default();
        config.ollama.base_url = "http://localhost:11434/".to_string();
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Some page text",
            system: "Summarize.",
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                num_predict: 500,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 500);
    }

    #[test]
    fn test_generate_response_parses_response_field() {
        let body = r#"{"model":"llama3.2","response":" A summary. ","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, " A summary. ");
    }

    #[test]
    fn test_shares_system_prompt_with_primary() {
        let config = AppConfig::default();
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.system_prompt, system_prompt("English"));
        assert!(backend.system_prompt.contains("3-5 sentences"));
    }
}
