//! Authentication module
//!
//! Xero uses OAuth2 with rotating refresh tokens. The `CredentialManager`
//! exchanges the configured refresh token for an access token and persists
//! the rotated refresh token before handing the access token out.

mod credentials;
mod types;

pub use credentials::{CredentialManager, TokenRefresher};
pub use types::AccessToken;
