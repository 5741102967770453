//! Request pipeline wrapping every call to the admin API.
//!
//! Outbound, the stored credential is attached under every header name the
//! server may inspect. Inbound, each response is classified:
//!
//! - no response at all: `transient-network`
//! - HTTP 401: the credential is cleared and a session-invalidated
//!   broadcast goes out before the error returns to the caller
//! - HTTP 400 / 403 / anything else: returned to the caller untouched
//! - HTTP 2xx: the body is parsed as an [`ApiEnvelope`]
//!
//! Nothing is retried.

use crate::classification::FailureClassification;
use crate::envelope::ApiEnvelope;
use crate::error::{ApiError, ApiResult};
use crate::invalidation::{InvalidationHub, Subscription};
use desk_config_and_utils::{Config, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use desk_storage::CredentialStore;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Bare-token header read by the server's token checks.
pub const SATOKEN_HEADER: &str = "satoken";

/// Alternate bare-token header.
pub const TOKEN_HEADER: &str = "token";

const MAX_SUMMARY_MESSAGE_LEN: usize = 120;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// API root including the `/api` prefix, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Derive pipeline settings from the client configuration.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url: base_url.to_string(),
            timeout: config.request_timeout(),
        })
    }
}

struct PipelineInner {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    invalidation: Arc<InvalidationHub>,
}

/// Shared entry point for every outbound API call. Cheap to clone.
#[derive(Clone)]
pub struct RequestPipeline {
    inner: Arc<PipelineInner>,
}

impl RequestPipeline {
    pub fn new(config: PipelineConfig, credentials: Arc<CredentialStore>) -> ApiResult<Self> {
        let parsed =
            Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(format!("{e}: {}", config.base_url)))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "cannot be used as a base: {}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        debug!(base_url = %config.base_url, timeout_ms = config.timeout.as_millis() as u64, "Request pipeline ready");

        Ok(Self {
            inner: Arc::new(PipelineInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                credentials,
                invalidation: InvalidationHub::new(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.inner.credentials
    }

    /// Absolute URL for an API path such as `/orders/42`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Register a handler for the session-invalidated broadcast. The handler
    /// runs synchronously once the credential has been cleared.
    pub fn on_session_invalidated<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.invalidation.subscribe(handler)
    }

    pub fn invalidation_subscribers(&self) -> usize {
        self.inner.invalidation.subscriber_count()
    }

    /// Start a request with the current credential attached.
    pub fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let builder = self.inner.client.request(method, self.url(path));
        self.authorize(builder)
    }

    fn authorize(&self, builder: RequestBuilder) -> ApiResult<RequestBuilder> {
        let Some(credential) = self.inner.credentials.read()? else {
            return Ok(builder);
        };

        let token = credential.as_str();
        Ok(builder
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(SATOKEN_HEADER, token)
            .header(TOKEN_HEADER, token))
    }

    /// Send a prepared request and classify the outcome.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> ApiResult<ApiEnvelope<T>> {
        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                warn!(
                    error = %source,
                    classification = %FailureClassification::TransientNetwork,
                    "Request failed without a response"
                );
                return Err(ApiError::Transport { source });
            }
        };

        let status = response.status();
        let path = response.url().path().to_string();
        // The status alone decides the classification; a body lost in
        // transit only costs the summary.
        let body = match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(
                    status = status.as_u16(),
                    path = %path,
                    error = %e,
                    "Failed to read response body"
                );
                None
            }
        };

        if !status.is_success() {
            let classification = FailureClassification::from_status(status.as_u16());
            let body_summary = match &body {
                Some(body) => summarize_response_body(body),
                None => "unreadable".to_string(),
            };
            warn!(
                status = status.as_u16(),
                path = %path,
                classification = %classification,
                body_summary = %body_summary,
                "API request failed"
            );

            if classification == FailureClassification::Unauthorized {
                self.invalidate_session();
            }

            return Err(ApiError::Status {
                status: status.as_u16(),
                classification,
                body_summary,
            });
        }

        let Some(body) = body else {
            return Err(ApiError::MalformedResponse(format!(
                "response body for HTTP {} could not be read",
                status.as_u16()
            )));
        };

        let raw: ApiEnvelope<Value> = serde_json::from_str(&body).map_err(|e| {
            warn!(path = %path, error = %e, "Response is not an API envelope");
            ApiError::MalformedResponse(format!("invalid envelope: {e}"))
        })?;

        if !raw.is_success() {
            debug!(path = %path, code = raw.code, message = %raw.message, "API returned business error");
        }

        raw.decode()
    }

    fn invalidate_session(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "Failed to clear credential after 401");
        }
        self.inner.invalidation.notify();
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        let builder = self.request(Method::GET, path)?;
        self.execute(builder).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        self.execute(builder).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> ApiResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(Method::POST, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.execute(builder).await
    }

    pub async fn put_with_query<T, Q>(&self, path: &str, query: &Q) -> ApiResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, path)?.query(query);
        self.execute(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        let builder = self.request(Method::DELETE, path)?;
        self.execute(builder).await
    }
}

/// Characters escaped inside one path segment: the URL path set plus the
/// separators that would split or end the segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%')
    .add(b'+')
    .add(b'\\');

/// Percent-encode a record id for use as a single path segment.
pub(crate) fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw.trim(), PATH_SEGMENT).to_string()
}

/// Log-safe description of an error body: the envelope message when there
/// is one, otherwise only its length and digest.
fn summarize_response_body(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            let message: String = message.chars().take(MAX_SUMMARY_MESSAGE_LEN).collect();
            return format!("message={message}");
        }
    }

    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_storage::MemoryStorage;

    fn pipeline(base_url: &str) -> ApiResult<RequestPipeline> {
        let store = Arc::new(CredentialStore::new(Box::new(MemoryStorage::new())));
        RequestPipeline::new(PipelineConfig::new(base_url), store)
    }

    #[test]
    fn test_url_joins_paths_under_api_prefix() {
        let pipeline = pipeline("http://localhost:8080/api/").unwrap();
        assert_eq!(pipeline.base_url(), "http://localhost:8080/api");
        assert_eq!(pipeline.url("/auth/info"), "http://localhost:8080/api/auth/info");
        assert_eq!(pipeline.url("orders/7"), "http://localhost:8080/api/orders/7");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(pipeline("not a url"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(pipeline("mailto:ops@example.com"), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_from_config_uses_timeout() {
        let config = Config {
            request_timeout_secs: 3,
            ..Config::default()
        };
        let pipeline_config = PipelineConfig::from_config(&config).unwrap();
        assert_eq!(pipeline_config.timeout, Duration::from_secs(3));
        assert!(pipeline_config.base_url.starts_with("http"));
    }

    #[test]
    fn test_path_segment_escapes_separators() {
        assert_eq!(path_segment("42"), "42");
        assert_eq!(path_segment(" 42 "), "42");
        assert_eq!(path_segment("a/b"), "a%2Fb");
        assert_eq!(path_segment("a?b#c"), "a%3Fb%23c");
    }

    #[test]
    fn test_path_segment_keeps_spaces_distinct_from_plus() {
        assert_eq!(path_segment("ORD 1"), "ORD%201");
        assert_eq!(path_segment("ORD+1"), "ORD%2B1");
        assert_eq!(path_segment("100%"), "100%25");
    }

    #[test]
    fn test_summarize_prefers_envelope_message() {
        assert_eq!(
            summarize_response_body(r#"{"code":403,"message":"no permission"}"#),
            "message=no permission"
        );
        let summary = summarize_response_body("<html>oops</html>");
        assert!(summary.starts_with("len=17,digest="));
    }
}
