//! Retry message formatting for the catalog client.
//!
//! Every failed attempt produces one warning line, and an exhausted budget produces
//! a multi-line summary with remediation hints. Keeping the wording here keeps the
//! retry loop in [`super::tmdb_http`] readable.

use std::time::Duration;

use crate::config::FailureClass;

/// Classification of a failed attempt for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// HTTP 404
    NotFound,
    /// Other non-2xx statuses
    ClientError(u16),
    /// No response received (connection, DNS, TLS, timeout)
    Network,
}

impl RetryErrorType {
    /// User-friendly description used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(code) => match code {
                401 => "authentication failed (401)",
                403 => "authentication failed (403)",
                _ => "authentication failed",
            },
            Self::NotFound => "resource not found",
            Self::ClientError(_) => "client error",
            Self::Network => "network error",
        }
    }

    /// Suggested remediation shown after the budget is exhausted.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::RateLimit => "Lower the request rate or raise TMDB_RATE_LIMIT_BACKOFF_MS",
            Self::ServerError(_) => "The catalog may be degraded, try again later",
            Self::AuthFailed(_) => "Verify TMDB_API_KEY (v3 key or v4 read-access token)",
            Self::NotFound => "The movie id may have been removed from the catalog",
            Self::ClientError(_) => "Review the request parameters against the API reference",
            Self::Network => "Check network connectivity and TMDB_BASE_URL",
        }
    }

    /// Budget class this failure draws from.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::RateLimit => FailureClass::RateLimited,
            _ => FailureClass::Other,
        }
    }
}

/// Classify a received HTTP status (`None` means no response was received).
pub fn classify_status(status: Option<u16>) -> RetryErrorType {
    match status {
        None => RetryErrorType::Network,
        Some(429) => RetryErrorType::RateLimit,
        Some(code @ (401 | 403)) => RetryErrorType::AuthFailed(code),
        Some(404) => RetryErrorType::NotFound,
        Some(code) if code >= 500 => RetryErrorType::ServerError(code),
        Some(code) => RetryErrorType::ClientError(code),
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Attempt budget
    pub max_attempts: u32,
    /// Classification of the failure
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub backoff: Duration,
    /// Endpoint path that failed
    pub endpoint: String,
    /// Underlying error text
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for one failed attempt.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff: Duration,
        endpoint: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff,
            endpoint: endpoint.into(),
            error_message: error_message.into(),
        }
    }

    /// Whether another attempt remains after this one.
    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// One-line warning for a failed attempt.
    pub fn format_retry(&self) -> String {
        if self.has_remaining() {
            format!(
                "Attempt {}/{} for {} failed: {} - waiting {:.1} seconds...",
                self.attempt,
                self.max_attempts,
                self.endpoint,
                self.error_type.description(),
                self.backoff.as_secs_f64()
            )
        } else {
            format!(
                "Attempt {}/{} for {} failed: {} - no attempts left",
                self.attempt,
                self.max_attempts,
                self.endpoint,
                self.error_type.description()
            )
        }
    }

    /// Message emitted when a request succeeds after at least one failure.
    pub fn format_success(&self) -> String {
        format!(
            "Request to {} succeeded on attempt {}/{}",
            self.endpoint, self.attempt, self.max_attempts
        )
    }

    /// Final failure summary with remediation hints.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!(
                "[FAILED] {} failed after {} attempts",
                self.endpoint, self.max_attempts
            ),
            format!("  Last error: {}", self.error_message),
            "  Suggestions:".to_string(),
        ];
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Suggestions tailored to this failure.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-attempts (current: {})",
                self.max_attempts
            ),
        ]
    }
}
