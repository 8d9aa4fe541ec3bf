//! Remote token fetching.
//!
//! The pipeline's two suspension points - fetching the payment JWT and
//! fetching the published key set - go through the [`RemoteTokenFetch`]
//! trait so the host application owns the HTTP stack. The provided
//! [`HttpTokenFetcher`] holds one pooled `reqwest` client, safe for
//! concurrent use without per-call locking; there is no retry, backoff, or
//! caching - a transport failure is terminal for that validation call.
//!
//! # Feature Flags
//!
//! This module requires the `http-fetcher` feature flag to be enabled for
//! actual HTTP requests. Without it, all requests return an
//! `Unimplemented` error.
//!
//! ```toml
//! [dependencies]
//! pixkit-lib = { version = "0.1", features = ["http-fetcher"] }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "http-fetcher")]
use std::time::Duration;

use crate::errors::PixError;
use crate::Result;

/// JSON fields searched, in order, for the JWT when a token endpoint wraps
/// it in an object.
const JWT_BODY_FIELDS: [&str; 6] = ["token", "jwt", "access_token", "id_token", "data", "payload"];

/// Configuration for the HTTP token fetcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `Accept` header sent with every request.
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    "pixkit-lib/1.0".to_string()
}

fn default_accept() -> String {
    "application/json, text/plain, */*".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Capability consumed by the pipeline: retrieve the payment JWT and the
/// published key set.
///
/// Implementations must be safe for concurrent calls; the pipeline never
/// serializes access.
#[async_trait]
pub trait RemoteTokenFetch {
    /// Fetches the body published at the dynamic-QR endpoint `url`.
    ///
    /// `url` comes straight out of the EMV code and usually has no scheme.
    async fn fetch_token(&self, url: &str) -> Result<String>;

    /// Fetches the key-set document at `url`.
    async fn fetch_key_set(&self, url: &str) -> Result<String>;
}

/// Prefixes `https://` when `url` carries no scheme.
///
/// URLs extracted from EMV codes never have one (their charset forbids
/// `:`); key URLs resolved from JWT claims usually do.
pub fn ensure_https(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Unwraps the JWT from a fetched body.
///
/// A body that looks like a JSON object is searched over the ordered field
/// list (`token, jwt, access_token, id_token, data, payload`); the first
/// field present wins. Anything else is treated as the raw JWT. `url` is
/// only used for error context.
pub fn extract_jwt_from_body(url: &str, body: &str) -> Result<String> {
    if !body.trim_start().starts_with('{') {
        return Ok(body.trim().to_string());
    }

    let root: Value = serde_json::from_str(body).map_err(|e| {
        PixError::remote_fetch_failed(url, format!("response looks like JSON but does not parse: {e}"))
    })?;

    for field in JWT_BODY_FIELDS {
        if let Some(value) = root.get(field) {
            // First matching field decides; a non-string value falls back
            // to the whole body.
            if let Some(token) = value.as_str().filter(|s| !s.trim().is_empty()) {
                return Ok(token.trim().to_string());
            }
            break;
        }
    }

    Ok(body.trim().to_string())
}

/// HTTP-backed [`RemoteTokenFetch`] implementation.
pub struct HttpTokenFetcher {
    config: FetcherConfig,
    #[cfg(feature = "http-fetcher")]
    client: reqwest::Client,
}

impl HttpTokenFetcher {
    /// Create a new fetcher with the given configuration.
    #[cfg(feature = "http-fetcher")]
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PixError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new fetcher with the given configuration (stub when feature disabled).
    #[cfg(not(feature = "http-fetcher"))]
    pub fn new(config: FetcherConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Create a fetcher with the default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(FetcherConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Make a GET request, returning the body text.
    #[cfg(feature = "http-fetcher")]
    async fn get_text(&self, url: &str) -> Result<String> {
        use reqwest::header::{ACCEPT, USER_AGENT};

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT, self.config.accept.as_str())
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(PixError::remote_fetch_failed(
                url,
                format!("HTTP {}: {}", status.as_u16(), reason),
            ));
        }

        response.text().await.map_err(|e| {
            PixError::remote_fetch_failed(url, format!("failed to read response body: {e}"))
        })
    }

    /// Make a GET request (stub when feature disabled).
    #[cfg(not(feature = "http-fetcher"))]
    async fn get_text(&self, _url: &str) -> Result<String> {
        Err(PixError::Unimplemented(
            "HTTP fetcher not compiled - enable the 'http-fetcher' feature",
        ))
    }

    /// Map reqwest errors to fetch failures.
    #[cfg(feature = "http-fetcher")]
    fn map_reqwest_error(&self, url: &str, e: reqwest::Error) -> PixError {
        if e.is_timeout() {
            PixError::remote_fetch_failed(
                url,
                format!("request timed out after {}s", self.config.timeout_secs),
            )
        } else if e.is_connect() {
            PixError::remote_fetch_failed(url, format!("connection failed: {e}"))
        } else {
            PixError::remote_fetch_failed(url, format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl RemoteTokenFetch for HttpTokenFetcher {
    async fn fetch_token(&self, url: &str) -> Result<String> {
        let target = ensure_https(url);
        let body = self.get_text(&target).await?;
        if body.trim().is_empty() {
            return Err(PixError::remote_fetch_failed(
                target,
                "empty response from server",
            ));
        }
        Ok(body)
    }

    async fn fetch_key_set(&self, url: &str) -> Result<String> {
        self.get_text(&ensure_https(url)).await
    }
}
