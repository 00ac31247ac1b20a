//! TMDB HTTP client
//!
//! Provides the single-request primitive for every catalog call:
//! - Credential injection (query key or bearer token)
//! - One bounded attempt budget shared by rate limits (429) and all other failures
//! - Per-class backoff: rate-limit backoff after 429, retry delay otherwise
//! - JSON decoding of successful bodies

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{EtlConfig, RetryPolicy};
use crate::fetcher::retry_formatter::{classify_status, RetryContext};
use crate::fetcher::tmdb_config::ApiCredential;
use crate::fetcher::transport::{HttpTransport, ReqwestTransport};
use crate::fetcher::{FetcherError, FetcherResult};

/// Catalog client used by the paginator and the extractor
pub struct TmdbHttpClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credential: ApiCredential,
    policy: RetryPolicy,
}

impl TmdbHttpClient {
    /// Create a client over an arbitrary transport
    ///
    /// # Arguments
    /// * `transport` - HTTP seam (reqwest in production)
    /// * `base_url` - API root without trailing slash (e.g. `https://api.themoviedb.org/3`)
    /// * `api_key` - v3 key or v4 read-access token
    /// * `policy` - attempt budget and backoffs
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        api_key: &str,
        policy: RetryPolicy,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: ApiCredential::detect(api_key),
            policy,
        }
    }

    /// Production client built from run configuration
    ///
    /// # Errors
    /// Fails if the API key is absent or the HTTP client cannot be built.
    pub fn from_config(config: &EtlConfig) -> crate::extractor::ExtractResult<Self> {
        let api_key = config.require_api_key()?;
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::new(
            transport,
            config.base_url.clone(),
            api_key,
            config.retry,
        ))
    }

    /// Retry policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `endpoint` and return the decoded JSON body
    ///
    /// # Errors
    /// [`FetcherError::ApiRequestExhausted`] once the attempt budget is spent;
    /// [`FetcherError::InvalidResponse`] if a 2xx body is not JSON.
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<Value> {
        self.get(endpoint, params).await
    }

    /// GET `endpoint` and deserialize the body into `T`
    pub async fn get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        query.extend(self.credential.query_pairs());
        let headers = self.credential.headers();

        debug!(endpoint, params = params.len(), "Making GET request");

        let max_attempts = self.policy.attempts();
        let mut last_status = None;

        for attempt in 1..=max_attempts {
            let (status, error_message) = match self.transport.get(&url, &query, &headers).await {
                Ok(response) if response.is_success() => {
                    if attempt > 1 {
                        let ctx = RetryContext::new(
                            attempt,
                            max_attempts,
                            classify_status(last_status),
                            std::time::Duration::ZERO,
                            endpoint,
                            "",
                        );
                        info!("{}", ctx.format_success());
                    }
                    return serde_json::from_str::<T>(&response.body).map_err(|e| {
                        FetcherError::InvalidResponse {
                            endpoint: endpoint.to_string(),
                            cause: e.to_string(),
                        }
                    });
                }
                Ok(response) => (Some(response.status), format!("status {}", response.status)),
                Err(e) => (None, e.to_string()),
            };

            last_status = status;
            let error_type = classify_status(status);
            let backoff = self.policy.backoff_for(error_type.failure_class());
            let ctx = RetryContext::new(
                attempt,
                max_attempts,
                error_type,
                backoff,
                endpoint,
                error_message,
            );

            warn!(
                endpoint,
                status = status.unwrap_or(0),
                attempt,
                max_attempts,
                "{}",
                ctx.format_retry()
            );

            if ctx.has_remaining() {
                tokio::time::sleep(backoff).await;
            } else {
                warn!("{}", ctx.format_failure());
            }
        }

        Err(FetcherError::ApiRequestExhausted {
            endpoint: endpoint.to_string(),
            last_status,
        })
    }
}

impl std::fmt::Debug for TmdbHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbHttpClient")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .field("policy", &self.policy)
            .finish()
    }
}
