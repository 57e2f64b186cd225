//! Retry policy for transient API failures
//!
//! One policy object maps each retryable failure class to a bounded attempt
//! count and a delay rule. The client consults it in an explicit loop.

use crate::error::{ApiErrorKind, Error};
use std::collections::HashMap;
use std::time::Duration;

/// Failure classes that may be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryClass {
    /// 429 scoped to the minute quota
    RateLimitMinute,
    /// 503
    ServiceUnavailable,
    /// 500
    ServerError,
    /// Body was not valid JSON
    MalformedResponse,
    /// Timeout or connection failure
    Transport,
}

impl RetryClass {
    /// Classify an error; `None` means the error is never retried
    pub fn of(error: &Error) -> Option<Self> {
        match error {
            Error::Api { kind, .. } => match kind {
                ApiErrorKind::RateLimitMinute => Some(Self::RateLimitMinute),
                ApiErrorKind::ServiceUnavailable => Some(Self::ServiceUnavailable),
                ApiErrorKind::InternalServerError => Some(Self::ServerError),
                _ => None,
            },
            Error::MalformedResponse { .. } => Some(Self::MalformedResponse),
            Error::Timeout { .. } => Some(Self::Transport),
            Error::Http(e) if e.is_timeout() || e.is_connect() => Some(Self::Transport),
            _ => None,
        }
    }
}

/// How long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// `initial_backoff` doubled per attempt
    Exponential,
    /// Server-provided `Retry-After`, falling back to exponential
    RetryAfter,
}

/// Attempt bound and delay rule for one class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryRule {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Delay,
}

impl RetryRule {
    /// Create a rule
    pub fn new(max_attempts: u32, delay: Delay) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Class-to-rule table plus backoff bounds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    rules: HashMap<RetryClass, RetryRule>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let rules = HashMap::from([
            (RetryClass::RateLimitMinute, RetryRule::new(3, Delay::RetryAfter)),
            (RetryClass::ServiceUnavailable, RetryRule::new(10, Delay::Exponential)),
            (RetryClass::ServerError, RetryRule::new(3, Delay::Exponential)),
            (RetryClass::MalformedResponse, RetryRule::new(3, Delay::Exponential)),
            (RetryClass::Transport, RetryRule::new(5, Delay::Exponential)),
        ]);

        Self {
            rules,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default rule table
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            rules: HashMap::new(),
            ..Self::default()
        }
    }

    /// Replace the rule for a class
    #[must_use]
    pub fn with_rule(mut self, class: RetryClass, rule: RetryRule) -> Self {
        self.rules.insert(class, rule);
        self
    }

    /// Set the exponential backoff bounds
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Rule for a class, if the class is retried at all
    pub fn rule(&self, class: RetryClass) -> Option<&RetryRule> {
        self.rules.get(&class)
    }

    /// Maximum delay between attempts
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Exponential delay after `attempt` (1-based) failed attempts
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.initial_backoff.saturating_mul(factor);
        std::cmp::min(delay, self.max_backoff)
    }

    /// Delay before the next attempt, or `None` when the error is final.
    ///
    /// `attempt` is the number of attempts already made.
    pub fn next_delay(
        &self,
        error: &Error,
        retry_after: Option<Duration>,
        attempt: u32,
    ) -> Option<Duration> {
        let rule = self.rule(RetryClass::of(error)?)?;
        if attempt >= rule.max_attempts {
            return None;
        }

        let delay = match (rule.delay, retry_after) {
            (Delay::RetryAfter, Some(wait)) => std::cmp::min(wait, self.max_backoff),
            _ => self.backoff(attempt),
        };
        Some(delay)
    }
}
