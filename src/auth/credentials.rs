//! Credential refresh
//!
//! Performs the OAuth2 refresh-token grant and persists the rotated refresh
//! token through the config store.

use super::types::{AccessToken, TokenResponse};
use crate::config::{ConfigStore, TapConfig};
use crate::error::{Error, Result, REAUTHORIZE_MESSAGE};
use crate::http::RetryPolicy;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Source of fresh access tokens
#[async_trait]
pub trait TokenRefresher: Send {
    /// Obtain a new access token
    async fn refresh(&mut self) -> Result<AccessToken>;
}

/// Refreshes credentials against the identity server.
///
/// Every successful refresh rotates the refresh token. The new value is
/// written to the config store before the access token is returned.
pub struct CredentialManager {
    http_client: Client,
    config: TapConfig,
    store: ConfigStore,
    retry: RetryPolicy,
}

impl CredentialManager {
    /// Create a manager with its own HTTP client
    pub fn new(config: TapConfig, store: ConfigStore) -> Result<Self> {
        let http_client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(config, store, http_client))
    }

    /// Create a manager sharing an existing HTTP client
    pub fn with_client(config: TapConfig, store: ConfigStore, http_client: Client) -> Self {
        Self {
            http_client,
            config,
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy for transport failures
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Current config, including the latest refresh token
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    fn basic_credentials(&self) -> String {
        let raw = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.config.refresh_token.as_str()),
        ];

        let mut attempt = 0;
        let response = loop {
            attempt += 1;

            let result = self
                .http_client
                .post(self.config.token_url())
                .header(AUTHORIZATION, self.basic_credentials())
                .form(&form)
                .send()
                .await;

            let error = match result {
                Ok(response) => break response,
                Err(e) if e.is_timeout() => Error::Timeout {
                    timeout_ms: self.config.request_timeout().as_millis() as u64,
                },
                Err(e) => Error::Http(e),
            };

            let Some(delay) = self.retry.next_delay(&error, None, attempt) else {
                return Err(error);
            };
            warn!(
                "Token refresh failed: {}, attempt {}, retrying in {:?}",
                error, attempt, delay
            );
            tokio::time::sleep(delay).await;
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::token_refresh(format!(
                "identity server returned {status}: {body}. {REAUTHORIZE_MESSAGE}"
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::token_refresh(format!("unreadable token response: {e}")))
    }
}

#[async_trait]
impl TokenRefresher for CredentialManager {
    async fn refresh(&mut self) -> Result<AccessToken> {
        let token = self.request_token().await?;
        debug!(expires_in = ?token.expires_in, "Received access token");

        self.config.refresh_token = token.refresh_token;
        self.store.save(&self.config).await?;
        info!("Refreshed credentials");

        Ok(AccessToken::new(token.access_token, self.config.tenant_id.clone()))
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("token_url", &self.config.token_url())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
