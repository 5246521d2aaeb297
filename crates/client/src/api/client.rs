//! HTTP gateway to the ordering API.
//!
//! All outgoing requests flow through [`ApiClient`]: it resolves paths
//! against the configured origin, attaches the bearer token, delegates
//! transport to the retry policy, and converts non-2xx responses into
//! typed errors carrying their classification. A 401 from any endpoint
//! except login clears the stored credentials before the error
//! propagates.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::auth::CredentialStore;
use crate::config::ClientConfig;

use super::error::{ApiError, is_login_path};
use super::retry::RetryPolicy;

/// Request body accepted by the gateway.
///
/// JSON values are encoded with an `application/json` content type; raw
/// strings pass through unchanged and leave the content type to the
/// caller's headers.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON-encoded body.
    Json(Value),
    /// Raw string body, passed through unencoded.
    Text(String),
}

/// Per-request options. `Default` is a plain retried GET.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Option<Method>,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Extra headers merged over the defaults.
    pub headers: Vec<(String, String)>,
    /// Do not attach the bearer token even if one is stored.
    pub skip_auth: bool,
    /// Issue a single bare attempt instead of the retry loop.
    pub skip_retry: bool,
    /// Per-attempt timeout override.
    pub timeout: Option<Duration>,
    /// Retry budget override.
    pub max_retries: Option<u32>,
}

/// Client for the Royal Burger ordering API.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// credential store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<CredentialStore>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client with the retry budget and timeout from `config`.
    #[must_use]
    pub fn new(config: &ClientConfig, credentials: Arc<CredentialStore>) -> Self {
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            timeout: config.timeout,
            ..RetryPolicy::default()
        };
        Self::with_policy(config, credentials, retry)
    }

    /// Create a client with an explicit retry policy.
    #[must_use]
    pub fn with_policy(
        config: &ClientConfig,
        credentials: Arc<CredentialStore>,
        retry: RetryPolicy,
    ) -> Self {
        // Cookies ride along for same-site session cooperation; timeouts
        // are owned by the retry policy, not the transport.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.clone(),
                credentials,
                retry,
            }),
        }
    }

    /// The credential store this client reads tokens from.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.inner.credentials
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// `GET path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or a non-2xx response.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(path, RequestOptions::default()).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or a non-2xx response.
    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.request(
            path,
            RequestOptions {
                method: Some(Method::POST),
                body: Some(RequestBody::Json(body)),
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or a non-2xx response.
    pub async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.request(
            path,
            RequestOptions {
                method: Some(Method::PUT),
                body: Some(RequestBody::Json(body)),
                ..RequestOptions::default()
            },
        )
        .await
    }

    /// `DELETE path`, optionally carrying a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or a non-2xx response.
    pub async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(
            path,
            RequestOptions {
                method: Some(Method::DELETE),
                body: body.map(RequestBody::Json),
                ..RequestOptions::default()
            },
        )
        .await
    }

    // =========================================================================
    // Core Request Path
    // =========================================================================

    /// Issue a request and return the parsed response body.
    ///
    /// The body is parsed as JSON when the response declares a JSON
    /// content type, otherwise returned as a JSON string value. Callers
    /// interpret the shape.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx responses (after clearing
    /// credentials on a non-login 401), `ApiError::Timeout` when the
    /// attempt budget is exceeded, and `ApiError::Transport` for
    /// network-level failures.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = self.resolve(path)?;

        let mut policy = self.inner.retry;
        if let Some(timeout) = options.timeout {
            policy.timeout = timeout;
        }
        if let Some(max_retries) = options.max_retries {
            policy.max_retries = max_retries;
        }
        if options.skip_retry {
            policy.max_retries = 0;
        }

        policy
            .execute(|| self.send_once(&url, path, &options), None)
            .await
    }

    /// Resolve `path` against the configured base origin, unless it is
    /// already absolute.
    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            Ok(Url::parse(path)?)
        } else {
            Ok(self.inner.base_url.join(path)?)
        }
    }

    async fn send_once(
        &self,
        url: &Url,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        let method = options.method.clone().unwrap_or(Method::GET);
        let mut request = self.inner.http.request(method, url.clone());

        request = match &options.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Text(text)) => request.body(text.clone()),
            None => request.header(CONTENT_TYPE, "application/json"),
        };

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if !options.skip_auth
            && let Some(token) = self.inner.credentials.token()
        {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let declared_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = response.text().await?;

        if status.is_success() {
            return if declared_json {
                if text.is_empty() {
                    Ok(Value::Null)
                } else {
                    serde_json::from_str(&text).map_err(ApiError::Decode)
                }
            } else {
                Ok(Value::String(text))
            };
        }

        let payload = if declared_json {
            serde_json::from_str(&text).ok()
        } else if text.is_empty() {
            None
        } else {
            Some(Value::String(text))
        };

        // A 401 outside the login flow means the session is gone; keeping
        // the token would resend a dead credential on every request.
        if status == StatusCode::UNAUTHORIZED && !is_login_path(path) {
            warn!(path, "session rejected by the server; clearing stored credentials");
            self.inner.credentials.logout_local();
        }

        Err(ApiError::from_status(status, payload))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client() -> ApiClient {
        let config = ClientConfig::new("http://localhost:5000".parse().unwrap());
        let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
        ApiClient::new(&config, credentials)
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = client().resolve("/api/cart/items").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/cart/items");
    }

    #[test]
    fn test_resolve_absolute_url_passes_through() {
        let url = client().resolve("https://cdn.example.com/asset.json").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/asset.json");
    }

    #[test]
    fn test_config_overrides_reach_policy() {
        let config = ClientConfig {
            base_url: "http://localhost:5000".parse().unwrap(),
            timeout: Duration::from_secs(5),
            max_retries: 1,
        };
        let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
        let client = ApiClient::new(&config, credentials);
        assert_eq!(client.inner.retry.timeout, Duration::from_secs(5));
        assert_eq!(client.inner.retry.max_retries, 1);
    }
}
