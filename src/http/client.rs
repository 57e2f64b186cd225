//! Xero accounting API client
//!
//! Provides an authenticated client that handles:
//! - Resource naming and envelope unwrapping
//! - Status classification into the API error taxonomy
//! - Bounded retries driven by a single [`RetryPolicy`]
//! - Optional client-side pacing

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::retry::RetryPolicy;
use crate::auth::AccessToken;
use crate::config::{TapConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::decode;
use crate::error::{ApiErrorKind, Error, Result};
use crate::types::Page;
use reqwest::header::{ACCEPT, IF_MODIFIED_SINCE, USER_AGENT};
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Header naming the organisation a request targets
const TENANT_HEADER: &str = "Xero-tenant-id";

/// Header distinguishing day-scoped from minute-scoped 429s
const RATE_LIMIT_PROBLEM_HEADER: &str = "X-Rate-Limit-Problem";

/// Map a stream id to its Xero resource name (`bank_transactions` -> `BankTransactions`)
pub fn resource_name(stream_id: &str) -> String {
    stream_id
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// ============================================================================
// Client Config
// ============================================================================

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.xero.com/api.xro/2.0`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Optional `User-Agent` header
    pub user_agent: Option<String>,
    /// Retry table for transient failures
    pub retry: RetryPolicy,
    /// Optional pacing
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: None,
            retry: RetryPolicy::default(),
            rate_limit: None,
        }
    }
}

impl ClientConfig {
    /// Derive the client config from the tap config
    pub fn from_tap_config(config: &TapConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
            retry: RetryPolicy::default(),
            rate_limit: config
                .max_requests_per_minute
                .map(RateLimiterConfig::per_minute),
        }
    }

    /// Set the API root
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}

// ============================================================================
// Filter Options
// ============================================================================

/// Parameters for one `filter` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Lower bound on modification time, sent as `If-Modified-Since`
    pub since: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Sort clause
    pub order: Option<String>,
    /// Journal number to continue after
    pub offset: Option<u64>,
    /// Stream-specific query parameters
    pub params: BTreeMap<String, String>,
}

impl FilterOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `since`
    #[must_use]
    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    /// Set the page number
    #[must_use]
    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the sort clause
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the journal offset
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Add a stream-specific query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

// ============================================================================
// Client
// ============================================================================

/// One failed attempt, with the server's requested wait if any
struct AttemptError {
    error: Error,
    retry_after: Option<Duration>,
}

impl From<Error> for AttemptError {
    fn from(error: Error) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// Authenticated Xero API client
pub struct XeroClient {
    client: Client,
    config: ClientConfig,
    credentials: Option<AccessToken>,
    rate_limiter: Option<RateLimiter>,
}

impl XeroClient {
    /// Create a client; credentials are installed later by the refresher
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            credentials: None,
            rate_limiter,
        })
    }

    /// Create a client from the tap config
    pub fn from_tap_config(config: &TapConfig) -> Result<Self> {
        Self::new(ClientConfig::from_tap_config(config))
    }

    /// Install a fresh access token
    pub fn set_credentials(&mut self, token: AccessToken) {
        self.credentials = Some(token);
    }

    /// Whether an access token is installed
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch one page of records for a stream.
    ///
    /// Transient failures are retried per the policy; a 401 is returned
    /// unchanged so the caller can refresh credentials.
    pub async fn filter(&self, stream_id: &str, options: &FilterOptions) -> Result<Page> {
        let resource = resource_name(stream_id);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match self.get_page(&resource, options).await {
                Ok(page) => {
                    debug!(resource = %resource, records = page.len(), "Fetched page");
                    return Ok(page);
                }
                Err(failure) => failure,
            };

            let Some(delay) = self
                .config
                .retry
                .next_delay(&failure.error, failure.retry_after, attempt)
            else {
                return Err(failure.error);
            };

            warn!(
                "{} failed: {}, attempt {}, retrying in {:?}",
                resource, failure.error, attempt, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Validate credentials and tenant access with a minimal request
    pub async fn check_platform_access(&self) -> Result<()> {
        self.filter("invoices", &FilterOptions::new().page(1))
            .await
            .map(|_| ())
    }

    async fn get_page(
        &self,
        resource: &str,
        options: &FilterOptions,
    ) -> std::result::Result<Page, AttemptError> {
        let token = self.credentials.as_ref().ok_or_else(|| {
            Error::config("No access token installed; refresh credentials before requesting")
        })?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self
            .client
            .get(self.resource_url(resource)?)
            .header(ACCEPT, "application/json")
            .header(TENANT_HEADER, token.tenant_id.as_str())
            .bearer_auth(&token.access_token)
            .query(&options.query_pairs());

        if let Some(agent) = &self.config.user_agent {
            req = req.header(USER_AGENT, agent.as_str());
        }
        if let Some(since) = &options.since {
            req = req.header(IF_MODIFIED_SINCE, since.as_str());
        }

        let response = req.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(classify_response(response).await);
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        Ok(decode::decode_page(&body, resource)?)
    }

    fn resource_url(&self, resource: &str) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{resource}"))?)
    }

    fn transport_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(error)
        }
    }
}

impl std::fmt::Debug for XeroClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XeroClient")
            .field("config", &self.config)
            .field("has_credentials", &self.credentials.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a non-success response into a classified error
async fn classify_response(response: Response) -> AttemptError {
    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let problem = header(RATE_LIMIT_PROBLEM_HEADER);
    let retry_after = header("retry-after").and_then(|s| s.trim().parse::<u64>().ok());

    match ApiErrorKind::classify(status, problem.as_deref()) {
        Some(kind) => AttemptError {
            error: Error::api(kind, retry_after),
            retry_after: retry_after.map(Duration::from_secs),
        },
        None => {
            let body = response.text().await.unwrap_or_default();
            AttemptError::from(Error::http_status(status, body))
        }
    }
}
