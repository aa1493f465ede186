//! REST clients for the three news APIs.
//!
//! - [`event_registry`] - article search/listing plus category, source and
//!   author suggestions
//! - [`news_org`] - top headlines
//! - [`nyt`] - most popular articles
//!
//! All three share the request plumbing in this module: a per-request
//! timeout, a response size limit, and exponential backoff on transient
//! failures (timeouts, network errors, 5xx, 429).

pub mod event_registry;
pub mod news_org;
pub mod nyt;
mod types;

pub use event_registry::{ArticleQuery, EventRegistryClient};
pub use news_org::{HeadlinesQuery, NewsOrgClient};
pub use nyt::{NytClient, PopularPeriod};
pub use types::{
    Article, ArticlePage, ArticleSource, Author, AuthorSuggestion, CategorySuggestion, Headline,
    HeadlineSource, HeadlinesResponse, Media, MediaMetadata, MostPopularResponse, PopularArticle,
    SourceSuggestion,
};

use crate::config::{ApiConfig, Config};
use crate::util::{validate_base_url, BaseUrlError};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while talking to a news API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.), stripped of the
    /// request URL since that carries the API key.
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not the JSON shape we expected
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// No API key configured for the service
    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
    /// Base URL failed validation
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] BaseUrlError),
    /// Endpoint URL could not be built
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Wrap a transport error without its URL, which carries the API key.
    fn network(e: reqwest::Error) -> Self {
        ApiError::Network(e.without_url())
    }

    /// Returns true if this error is transient and the request should be retried.
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::HttpStatus(status) => *status >= 500 || *status == 429,
            ApiError::RateLimited(_)
            | ApiError::ResponseTooLarge
            | ApiError::Decode(_)
            | ApiError::MissingApiKey(_)
            | ApiError::BaseUrl(_)
            | ApiError::InvalidUrl(_) => false,
        }
    }
}

// ============================================================================
// Request Settings
// ============================================================================

/// Backoff schedule for transient failures.
///
/// Delays double from `base_delay` and are capped at `max_delay`, so the
/// defaults wait 1s, 2s, 4s before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Per-request limits shared by every client.
#[derive(Debug, Clone, Copy)]
pub struct RequestSettings {
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub retry: RetryPolicy,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_response_bytes: MAX_RESPONSE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// A validated base URL plus the API key used against it.
///
/// The key is held as a [`SecretString`] and never appears in `Debug` output
/// or logs.
pub struct Endpoint {
    service: &'static str,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Endpoint {
    pub fn new(
        service: &'static str,
        base_url: &str,
        api_key: Option<SecretString>,
    ) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self {
            service,
            base_url,
            api_key,
        })
    }

    fn from_config(
        service: &'static str,
        config: &ApiConfig,
        default_base_url: &str,
    ) -> Result<Self, ApiError> {
        let base = config.base_url.as_deref().unwrap_or(default_base_url);
        let key = config.api_key.clone().map(SecretString::from);
        Self::new(service, base, key)
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Build `{base}/{path}`. The base path is preserved (no `Url::join`
    /// semantics, which would drop the last segment).
    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    pub(crate) fn api_key(&self) -> Result<&str, ApiError> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .ok_or(ApiError::MissingApiKey(self.service))
    }
}

// ============================================================================
// Client Set
// ============================================================================

/// The three API clients built from one [`Config`].
pub struct Clients {
    pub event_registry: EventRegistryClient,
    pub news_org: NewsOrgClient,
    pub nyt: NytClient,
}

impl Clients {
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let settings = RequestSettings {
            timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            ..RequestSettings::default()
        };
        let http = reqwest::Client::builder()
            .user_agent(concat!("newsdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::network)?;

        Ok(Self {
            event_registry: EventRegistryClient::new(
                http.clone(),
                Endpoint::from_config(
                    event_registry::SERVICE,
                    &config.news_api,
                    event_registry::DEFAULT_BASE_URL,
                )?,
                settings,
            ),
            news_org: NewsOrgClient::new(
                http.clone(),
                Endpoint::from_config(
                    news_org::SERVICE,
                    &config.news_org,
                    news_org::DEFAULT_BASE_URL,
                )?,
                settings,
            ),
            nyt: NytClient::new(
                http,
                Endpoint::from_config(nyt::SERVICE, &config.nyt, nyt::DEFAULT_BASE_URL)?,
                settings,
            ),
        })
    }
}

// ============================================================================
// Request Plumbing
// ============================================================================

/// GET `url` and decode the body as JSON, retrying transient failures.
///
/// 4xx responses (other than 429) fail immediately. The URL carries the API
/// key as a query parameter, so only its path is ever logged.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    settings: &RequestSettings,
) -> Result<T, ApiError> {
    let mut retry_count = 0;

    loop {
        match get_bytes(client, url, settings).await {
            Ok(bytes) => return Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.is_retryable() && retry_count < settings.retry.max_retries => {
                let delay = settings.retry.delay(retry_count);
                tracing::warn!(
                    path = %url.path(),
                    error = %e,
                    retry = retry_count + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Transient API error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
            }
            Err(ApiError::HttpStatus(429)) => {
                return Err(ApiError::RateLimited(settings.retry.max_retries))
            }
            Err(e) => return Err(e),
        }
    }
}

async fn get_bytes(
    client: &reqwest::Client,
    url: &Url,
    settings: &RequestSettings,
) -> Result<Vec<u8>, ApiError> {
    let response = tokio::time::timeout(
        settings.timeout,
        client
            .get(url.clone())
            .header("Accept", "application/json")
            .send(),
    )
    .await
    .map_err(|_| ApiError::Timeout)?
    .map_err(ApiError::network)?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(path = %url.path(), status = status.as_u16(), "Non-success status");
        return Err(ApiError::HttpStatus(status.as_u16()));
    }

    read_limited_bytes(response, settings.max_response_bytes).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Append `(name, value)` pairs to `url`, skipping `None` values.
pub(crate) fn with_query<'a, I>(mut url: Url, pairs: I) -> Url
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in pairs {
            if let Some(value) = value {
                query.append_pair(name, &value);
            }
        }
    }
    url
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Ping {
        ok: bool,
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(10), Duration::from_secs(30));
        assert_eq!(policy.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let endpoint = endpoint("test", "https://api.example.com/api/v1/");
        let url = endpoint.url("/article/getArticles").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/article/getArticles");
    }

    #[test]
    fn test_endpoint_debug_redacts_key() {
        let endpoint = endpoint("test", "https://api.example.com");
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_api_key() {
        let endpoint = Endpoint::new("nyt", "https://api.example.com", None).unwrap();
        assert!(matches!(endpoint.api_key(), Err(ApiError::MissingApiKey("nyt"))));
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result = Endpoint::new("test", "http://evil.example.com", None);
        assert!(matches!(result, Err(ApiError::BaseUrl(_))));
    }

    #[test]
    fn test_with_query_skips_none() {
        let url = Url::parse("https://api.example.com/x").unwrap();
        let url = with_query(
            url,
            [("a", Some("1".to_string())), ("b", None), ("c", Some("x y".to_string()))],
        );
        assert_eq!(url.query(), Some("a=1&c=x+y"));
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let ping: Ping = get_json(&reqwest::Client::new(), &url, &fast_settings())
            .await
            .unwrap();
        assert!(ping.ok);
    }

    #[tokio::test]
    async fn test_get_json_404_fails_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> =
            get_json(&reqwest::Client::new(), &url, &fast_settings()).await;
        assert!(matches!(result, Err(ApiError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_get_json_500_retries_then_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> =
            get_json(&reqwest::Client::new(), &url, &fast_settings()).await;
        assert!(matches!(result, Err(ApiError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_get_json_503_retry_then_success() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let ping: Ping = get_json(&reqwest::Client::new(), &url, &fast_settings())
            .await
            .unwrap();
        assert!(ping.ok);
    }

    #[tokio::test]
    async fn test_get_json_rate_limited() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(4)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> =
            get_json(&reqwest::Client::new(), &url, &fast_settings()).await;
        assert!(matches!(result, Err(ApiError::RateLimited(3))));
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> =
            get_json(&reqwest::Client::new(), &url, &fast_settings()).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_get_json_response_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&mock_server)
            .await;

        let settings = RequestSettings {
            max_response_bytes: 1024,
            ..fast_settings()
        };
        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> = get_json(&reqwest::Client::new(), &url, &settings).await;
        assert!(matches!(result, Err(ApiError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_network_error_hides_api_key() {
        // Nothing listens on port 1
        let endpoint = Endpoint::new(
            "news_api",
            "http://127.0.0.1:1",
            Some(SecretString::from("SUPERSECRETKEY")),
        )
        .unwrap();
        let url = with_query(
            endpoint.url("article/getArticles").unwrap(),
            [("apiKey", Some(endpoint.api_key().unwrap().to_string()))],
        );

        let result: Result<Ping, _> =
            get_json(&reqwest::Client::new(), &url, &fast_settings()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
        assert!(!format!("{:?}", err).contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn test_get_json_timeout_after_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"ok":true}"#)
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        let settings = RequestSettings {
            timeout: Duration::from_millis(50),
            ..fast_settings()
        };
        let url = Url::parse(&format!("{}/ping", mock_server.uri())).unwrap();
        let result: Result<Ping, _> = get_json(&reqwest::Client::new(), &url, &settings).await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }
}
