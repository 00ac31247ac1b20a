//! Catalog API access
//!
//! - [`tmdb_http`] - single-request client with the bounded retry policy
//! - [`pagination`] - page-budgeted listing aggregation
//! - [`transport`] - the HTTP seam (reqwest in production, scripted in tests)
//! - [`tmdb_config`] - endpoint paths and credential handling
//! - [`retry_formatter`] - retry log message formatting

pub mod pagination;
pub mod retry_formatter;
pub mod tmdb_config;
pub mod tmdb_http;
pub mod transport;

pub use pagination::PaginationHelper;
pub use tmdb_http::TmdbHttpClient;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};

/// Fetcher errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Retry budget exhausted without a successful response
    #[error(
        "request to {endpoint} failed after exhausting retries (last status: {})",
        describe_status(.last_status)
    )]
    ApiRequestExhausted {
        /// Endpoint path (e.g. "/movie/popular")
        endpoint: String,
        /// Status of the last attempt; `None` if it failed before a response
        last_status: Option<u16>,
    },

    /// Successful status with a body that is not the expected JSON
    #[error("invalid response from {endpoint}: {cause}")]
    InvalidResponse {
        /// Endpoint path
        endpoint: String,
        /// Decoder message
        cause: String,
    },

    /// Transport-level failure (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),
}

fn describe_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no response".to_string())
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
