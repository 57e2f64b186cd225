//! Tap configuration
//!
//! The config is a JSON object supplied by the user. It is rewritten in place
//! whenever the OAuth refresh token rotates, so unknown keys are kept verbatim
//! and lenient fields keep the representation the user wrote.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Keys that must be present in every config
pub const REQUIRED_CONFIG_KEYS: [&str; 5] = [
    "start_date",
    "client_id",
    "client_secret",
    "tenant_id",
    "refresh_token",
];

/// Default Xero accounting API root
pub const DEFAULT_BASE_URL: &str = "https://api.xero.com/api.xro/2.0";

/// Default Xero identity token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://identity.xero.com/connect/token";

/// Timeout applied when `request_timeout` is absent, empty or zero
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Global floor for incremental streams (ISO-8601)
    pub start_date: String,

    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Current OAuth refresh token; rotated on every refresh
    pub refresh_token: String,

    /// Xero organisation (tenant) id
    pub tenant_id: String,

    /// Optional outbound `User-Agent` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// `true` or `"true"` to include archived contacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_archived_contacts: Option<JsonValue>,

    /// Per-request timeout in seconds (number or numeric string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<JsonValue>,

    /// Override for the API root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override for the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// Optional client-side pacing of API calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_minute: Option<u32>,

    /// Any other keys, preserved on rewrite
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl TapConfig {
    /// Build a config from a JSON value, reporting the first missing required key
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::config("Config must be a JSON object"))?;

        for key in REQUIRED_CONFIG_KEYS {
            if !object.contains_key(key) {
                return Err(Error::missing_field(key));
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Load a config from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;
        Self::from_json(&contents)
    }

    /// Whether archived contacts were requested.
    ///
    /// Accepts the boolean `true` or the string `"true"`; anything else is false.
    pub fn include_archived_contacts(&self) -> bool {
        match &self.include_archived_contacts {
            Some(JsonValue::Bool(flag)) => *flag,
            Some(JsonValue::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Effective per-request timeout
    pub fn request_timeout(&self) -> Duration {
        let seconds = match &self.request_timeout {
            Some(JsonValue::Number(n)) => n.as_f64(),
            Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        seconds
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Effective API root
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Effective token endpoint
    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }
}

// ============================================================================
// Config Store
// ============================================================================

/// Durable home of the config file.
///
/// The store rewrites the whole file with a temp-file-then-rename so a crash
/// mid-write never leaves a truncated config behind.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Store backed by a file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Store that discards writes (inline config, tests)
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist the config
    pub async fn save(&self, config: &TapConfig) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(config)?;

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::config(format!("Failed to rename config file: {e}")))?;

        debug!(path = %path.display(), "Persisted config");
        Ok(())
    }
}
