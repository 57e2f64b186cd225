//! Error types for the Xero tap
//!
//! This module defines the error hierarchy for the whole crate, including the
//! closed classification of Xero API failures by HTTP status.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// Message used when a refreshed token is still rejected, or the refresh
/// itself is rejected by the identity server.
pub const REAUTHORIZE_MESSAGE: &str = "Failed to refresh OAuth token using the credentials from the config. \
The token might need to be reauthorized from the integration's properties \
or there could be another authentication issue. Please attempt to reauthorize the integration.";

/// Classified Xero API failure, keyed by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 412
    PreconditionFailed,
    /// 429 with `X-Rate-Limit-Problem: day`
    RateLimitDay,
    /// 429 for any other (minute, app-minute) limit
    RateLimitMinute,
    /// 500
    InternalServerError,
    /// 501
    NotImplemented,
    /// 503
    ServiceUnavailable,
}

impl ApiErrorKind {
    /// Classify a status code. `rate_limit_problem` is the value of the
    /// `X-Rate-Limit-Problem` response header, if any.
    pub fn classify(status: u16, rate_limit_problem: Option<&str>) -> Option<Self> {
        let kind = match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            412 => Self::PreconditionFailed,
            429 => match rate_limit_problem {
                Some(problem) if problem.eq_ignore_ascii_case("day") => Self::RateLimitDay,
                _ => Self::RateLimitMinute,
            },
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            503 => Self::ServiceUnavailable,
            _ => return None,
        };
        Some(kind)
    }

    /// HTTP status code for this kind
    pub fn status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::PreconditionFailed => 412,
            Self::RateLimitDay | Self::RateLimitMinute => 429,
            Self::InternalServerError => 500,
            Self::NotImplemented => 501,
            Self::ServiceUnavailable => 503,
        }
    }

    /// Human-readable message template
    pub fn message(self) -> &'static str {
        match self {
            Self::BadRequest => "A validation exception has occurred.",
            Self::Unauthorized => "Invalid authorization credentials.",
            Self::Forbidden => "User doesn't have permission to access the resource.",
            Self::NotFound => "The resource you have specified cannot be found.",
            Self::PreconditionFailed => {
                "One or more conditions given in the request header fields were invalid."
            }
            Self::RateLimitDay | Self::RateLimitMinute => {
                "The API rate limit for your organisation/application pairing has been exceeded."
            }
            Self::InternalServerError => {
                "An unhandled error with the Xero API. Contact the Xero API team if problems persist."
            }
            Self::NotImplemented => "The method you have called has not been implemented.",
            Self::ServiceUnavailable => "API service is currently unavailable.",
        }
    }
}

/// The main error type for the tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    #[error("Received Not Authorized response after credential refresh. {}", REAUTHORIZE_MESSAGE)]
    ReauthorizationRequired,

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP-error-code: {status}, Error: {message}")]
    Api {
        kind: ApiErrorKind,
        status: u16,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed response from '{resource}': {message}")]
    MalformedResponse { resource: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // State / Catalog / Output Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a classified API error. `retry_after` is appended to the
    /// rate-limit message when present.
    pub fn api(kind: ApiErrorKind, retry_after: Option<u64>) -> Self {
        let message = match (kind, retry_after) {
            (ApiErrorKind::RateLimitDay | ApiErrorKind::RateLimitMinute, Some(secs)) => {
                format!("{} Please retry after {secs} seconds", kind.message())
            }
            _ => kind.message().to_string(),
        };
        Self::Api {
            kind,
            status: kind.status(),
            message,
        }
    }

    /// Create an HTTP status error for an unclassified status
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a token refresh error
    pub fn token_refresh(message: impl Into<String>) -> Self {
        Self::TokenRefresh {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// The classified API kind, if this is an API error
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error is an HTTP 401
    pub fn is_unauthorized(&self) -> bool {
        self.api_kind() == Some(ApiErrorKind::Unauthorized)
    }
}

/// Result type alias for the tap
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(400, "HTTP-error-code: 400, Error: A validation exception has occurred." ; "bad request")]
    #[test_case(401, "HTTP-error-code: 401, Error: Invalid authorization credentials." ; "unauthorized")]
    #[test_case(403, "HTTP-error-code: 403, Error: User doesn't have permission to access the resource." ; "forbidden")]
    #[test_case(404, "HTTP-error-code: 404, Error: The resource you have specified cannot be found." ; "not found")]
    #[test_case(412, "HTTP-error-code: 412, Error: One or more conditions given in the request header fields were invalid." ; "precondition failed")]
    #[test_case(500, "HTTP-error-code: 500, Error: An unhandled error with the Xero API. Contact the Xero API team if problems persist." ; "internal error")]
    #[test_case(501, "HTTP-error-code: 501, Error: The method you have called has not been implemented." ; "not implemented")]
    #[test_case(503, "HTTP-error-code: 503, Error: API service is currently unavailable." ; "unavailable")]
    fn test_api_error_messages(status: u16, expected: &str) {
        let kind = ApiErrorKind::classify(status, None).unwrap();
        assert_eq!(Error::api(kind, None).to_string(), expected);
    }

    #[test]
    fn test_rate_limit_messages_carry_retry_after() {
        let day = ApiErrorKind::classify(429, Some("day")).unwrap();
        assert_eq!(day, ApiErrorKind::RateLimitDay);
        assert_eq!(
            Error::api(day, Some(1000)).to_string(),
            "HTTP-error-code: 429, Error: The API rate limit for your organisation/application \
             pairing has been exceeded. Please retry after 1000 seconds"
        );

        let minute = ApiErrorKind::classify(429, Some("minute")).unwrap();
        assert_eq!(minute, ApiErrorKind::RateLimitMinute);
        assert!(Error::api(minute, Some(5))
            .to_string()
            .ends_with("Please retry after 5 seconds"));
    }

    #[test]
    fn test_unclassified_status() {
        assert!(ApiErrorKind::classify(418, None).is_none());
        assert!(ApiErrorKind::classify(502, None).is_none());
    }
}
