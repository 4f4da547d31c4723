use thiserror::Error;

/// Terminal failure of a single summarization backend, reported after its
/// retry policy has run to completion.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("rate limited after {attempts} attempts: {message}")]
    RateLimited { attempts: u32, message: String },

    #[error("request failed after {attempts} attempts: {message}")]
    Api { attempts: u32, message: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Every configured backend was tried and failed. Both causes are kept so
    /// callers can tell an unreachable fallback apart from an exhausted one.
    #[error("all summarization backends failed; {primary_name}: {primary}; {secondary_name}: {secondary}")]
    BackendsExhausted {
        primary_name: &'static str,
        primary: BackendError,
        secondary_name: &'static str,
        secondary: BackendError,
    },

    #[error("History record not found: {0}")]
    RecordNotFound(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
