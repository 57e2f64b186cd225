//! HTTP client module
//!
//! Provides the Xero API client with retry, pacing and error classification.
//!
//! # Features
//!
//! - **Error Taxonomy**: every non-success status maps to a typed error
//! - **Automatic Retries**: one [`RetryPolicy`] table, bounded per failure class
//! - **Rate Limiting**: optional token bucket pacing using governor
//! - **Envelope Unwrapping**: responses decoded into pages of records

mod client;
mod rate_limit;
mod retry;

pub use client::{resource_name, ClientConfig, FilterOptions, XeroClient};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{Delay, RetryClass, RetryPolicy, RetryRule};
