use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy};
use url::Url;

use crate::config::AppConfig;
use crate::{Error, Result};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Page fetcher with a browser-like HTTP client
pub struct PageFetcher {
    client: Client,
    max_page_bytes: usize,
}

impl PageFetcher {
    /// Create a new page fetcher with configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Self::build_client(config.fetch.request_timeout_secs, &config.fetch.proxy_url)?;

        Ok(Self {
            client,
            max_page_bytes: config.fetch.max_page_bytes,
        })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ref proxy) = proxy_url {
            let proxy =
                Proxy::all(proxy).map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for page fetching");
        }

        builder.build().map_err(Error::Http)
    }

    /// Build browser-like headers for a request
    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,ru-RU;q=0.8,ru;q=0.7"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }

    /// Validate that a URL is absolute http(s) with a host
    pub fn validate_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::Page(format!("Unsupported URL scheme: {}", url)));
        }
        if parsed.host_str().is_none() {
            return Err(Error::Page(format!("URL has no host: {}", url)));
        }
        Ok(parsed)
    }

    /// Fetch the HTML body of a page
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Self::validate_url(url)?;

        tracing::info!("Fetching page: {}", parsed);

        let response = self
            .client
            .get(parsed.clone())
            .headers(Self::build_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Page(format!("HTTP {} for URL: {}", status, parsed)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.is_empty() && !content_type.contains("text/html") {
            tracing::warn!("Non-HTML content type for {}: {}", parsed, content_type);
        }

        let body = response.bytes().await?;
        if body.len() > self.max_page_bytes {
            return Err(Error::Page(format!(
                "Page too large ({} bytes) for URL: {}",
                body.len(),
                parsed
            )));
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_http_urls() {
        assert!(PageFetcher::validate_url("https://example.com/article").is_ok());
        assert!(PageFetcher::validate_url("http://example.com").is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(PageFetcher::validate_url("ftp://example.com/file").is_err());
        assert!(PageFetcher::validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_rejects_relative_urls() {
        assert!(PageFetcher::validate_url("example.com/article").is_err());
        assert!(PageFetcher::validate_url("/article").is_err());
    }
}
