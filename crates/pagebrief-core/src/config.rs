use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            fetch: FetchConfig::default(),
            ai: AiConfig::default(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
            cache: CacheConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub request_timeout_secs: u64,
    /// HTTP proxy URL for page fetching (e.g., "http://127.0.0.1:7890")
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Maximum extracted text length (chars) passed to the backends
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Maximum page size in bytes
    #[serde(default = "default_max_page_bytes")]
    pub max_page_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_fetch_timeout(),
            proxy_url: None,
            max_text_length: default_max_text_length(),
            max_page_bytes: default_max_page_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Summary language (e.g., "English", "Russian", "Japanese")
    #[serde(default = "default_summary_language")]
    pub summary_language: String,
    /// Max tokens for the generated summary
    #[serde(default = "default_max_summary_tokens")]
    pub max_summary_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            summary_language: default_summary_language(),
            max_summary_tokens: default_max_summary_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// OpenAI API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// API base URL (direct or proxy endpoint)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Attempt cap for a single summarize call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry delay in seconds (doubles per attempt)
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
    /// Admitted requests per trailing rate-limit window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,
    /// Rate-limit window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama base URL
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Attempt cap for a single summarize call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry delay in seconds (doubles per attempt)
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
    /// Liveness probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Generation request timeout in seconds
    #[serde(default = "default_ollama_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            probe_timeout_secs: default_probe_timeout(),
            request_timeout_secs: default_ollama_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached summaries
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of retained history records
    #[serde(default = "default_history_max_entries")]
    pub max_entries: usize,
    /// History file path (defaults to <data_dir>/request_history.json)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_history_max_entries(),
            file: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagebrief")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_text_length() -> usize {
    5000
}

fn default_max_page_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_summary_language() -> String {
    "English".to_string()
}

fn default_max_summary_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.3
}

fn default_openai_base_url() -> String {
    "https://api.proxyapi.ru/openai/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1
}

fn default_rate_limit_requests() -> usize {
    20
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_ollama_timeout() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    100
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_history_max_entries() -> usize {
    100
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load configuration from file (or defaults), overlay environment
    /// variables and validate the result.
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Overlay settings from environment variables. Provider credentials and
    /// endpoints use their conventional names; tuning knobs are prefixed.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(base) = env_string("OPENAI_BASE_URL") {
            self.openai.base_url = base;
        }
        if let Some(model) = env_string("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(base) = env_string("OLLAMA_BASE_URL") {
            self.ollama.base_url = base;
        }
        if let Some(model) = env_string("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(retries) = env_parse("PAGEBRIEF_MAX_RETRIES") {
            self.openai.max_retries = retries;
            self.ollama.max_retries = retries;
        }
        if let Some(delay) = env_parse("PAGEBRIEF_BASE_DELAY_SECS") {
            self.openai.base_delay_secs = delay;
            self.ollama.base_delay_secs = delay;
        }
        if let Some(requests) = env_parse("PAGEBRIEF_RATE_LIMIT_REQUESTS") {
            self.openai.rate_limit_requests = requests;
        }
        if let Some(window) = env_parse("PAGEBRIEF_RATE_LIMIT_WINDOW_SECS") {
            self.openai.rate_limit_window_secs = window;
        }
        if let Some(capacity) = env_parse("PAGEBRIEF_CACHE_CAPACITY") {
            self.cache.capacity = capacity;
        }
        if let Some(ttl) = env_parse("PAGEBRIEF_CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
    }

    /// Reject configurations that would wedge the process at runtime. A zero
    /// admission quota or window would block every summarize call forever.
    pub fn validate(&self) -> crate::Result<()> {
        if self.openai.rate_limit_requests == 0 {
            return Err(crate::Error::Config(
                "openai.rate_limit_requests must be at least 1".to_string(),
            ));
        }
        if self.openai.rate_limit_window_secs == 0 {
            return Err(crate::Error::Config(
                "openai.rate_limit_window_secs must be at least 1".to_string(),
            ));
        }
        if self.openai.max_retries == 0 {
            return Err(crate::Error::Config(
                "openai.max_retries must be at least 1".to_string(),
            ));
        }
        if self.ollama.max_retries == 0 {
            return Err(crate::Error::Config(
                "ollama.max_retries must be at least 1".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(crate::Error::Config(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_text_length == 0 {
            return Err(crate::Error::Config(
                "fetch.max_text_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/pagebrief/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("pagebrief")
            .join("config.toml")
    }

    /// Get the history file path
    pub fn history_path(&self) -> PathBuf {
        match &self.history.file {
            Some(path) => expand_tilde(path),
            None => self.data_dir().join("request_history.json"),
        }
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.fetch.max_text_length, 5000);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = AppConfig::default();
        config.openai.rate_limit_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = AppConfig::default();
        config.openai.rate_limit_window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = AppConfig::default();
        config.ollama.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_path_override() {
        let mut config = AppConfig::default();
        config.history.file = Some(PathBuf::from("/tmp/history.json"));
        assert_eq!(config.history_path(), PathBuf::from("/tmp/history.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [openai]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.max_retries, 3);
        assert_eq!(config.cache.capacity, 100);
    }
}
