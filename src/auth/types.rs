//! Authentication types

use serde::Deserialize;

/// Credentials attached to every API request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// OAuth2 bearer token
    pub access_token: String,
    /// Xero organisation the token is used against
    pub tenant_id: String,
}

impl AccessToken {
    /// Create a new access token
    pub fn new(access_token: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// OAuth2 refresh-token grant response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
