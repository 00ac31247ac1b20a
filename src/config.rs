//! Run configuration
//!
//! Everything the pipeline needs is read once at process start into an
//! [`EtlConfig`] and handed to each component constructor. Values required only
//! by one phase (API key, database URL, warehouse credentials) are validated by
//! that phase before it performs any I/O.

use std::path::PathBuf;
use std::time::Duration;

/// Default catalog API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default root directory for snapshot tiers
pub const DEFAULT_DATA_DIR: &str = "data";

/// Attempts per logical request, shared by every failure class.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait after a non-429 failure before the next attempt.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Wait after a 429 before the next attempt.
pub const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 2_000;

/// Pause between consecutive listing pages.
pub const DEFAULT_PAGE_PAUSE_MS: u64 = 200;

/// Pages fetched per listing endpoint.
pub const DEFAULT_LISTING_PAGES: u32 = 5;

/// Movies from the popular listing that get details and credits fetched.
pub const DEFAULT_DETAIL_LIMIT: usize = 50;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required value absent (or empty)
    #[error("missing required configuration value {name}")]
    ConfigMissing {
        /// Environment variable name
        name: String,
    },

    /// Value present but not parseable
    #[error("invalid value for {name}: {value:?}")]
    ConfigInvalid {
        /// Environment variable name
        name: String,
        /// Raw value
        value: String,
    },
}

/// Result type for configuration lookups
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure classes that draw from the retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429
    RateLimited,
    /// Any other non-2xx status or a transport failure
    Other,
}

/// Bounded retry policy for catalog requests
///
/// Both failure classes consume the same budget; only the wait differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed per request (minimum 1)
    pub max_attempts: u32,
    /// Wait after a non-429 failure
    pub retry_delay: Duration,
    /// Wait after a 429
    pub rate_limit_backoff: Duration,
}

impl RetryPolicy {
    /// Policy with no waits, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_delay: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
        }
    }

    /// Attempt budget, never below one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait applied before retrying after a failure of `class`
    pub fn backoff_for(&self, class: FailureClass) -> Duration {
        match class {
            FailureClass::RateLimited => self.rate_limit_backoff,
            FailureClass::Other => self.retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            rate_limit_backoff: Duration::from_millis(DEFAULT_RATE_LIMIT_BACKOFF_MS),
        }
    }
}

/// Extraction volume settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSettings {
    /// Pages per listing endpoint
    pub listing_pages: u32,
    /// Pause between listing pages
    pub page_pause: Duration,
    /// Number of popular movies whose details/credits are fetched
    pub detail_limit: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            listing_pages: DEFAULT_LISTING_PAGES,
            page_pause: Duration::from_millis(DEFAULT_PAGE_PAUSE_MS),
            detail_limit: DEFAULT_DETAIL_LIMIT,
        }
    }
}

/// Warehouse connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    /// Path to the service-account JSON key
    pub credentials_path: PathBuf,
    /// Cloud project id
    pub project_id: String,
    /// Dataset holding the five tables
    pub dataset: String,
}

/// Explicit configuration for one pipeline run
#[derive(Clone, PartialEq, Eq)]
pub struct EtlConfig {
    /// Catalog API key or v4 read-access token
    pub api_key: Option<String>,
    /// Catalog API base URL
    pub base_url: String,
    /// Root of the raw/processed/clean snapshot tiers
    pub data_dir: PathBuf,
    /// PostgreSQL connection string
    pub database_url: Option<String>,
    /// Service-account key path
    pub gcp_credentials: Option<PathBuf>,
    /// Cloud project id
    pub gcp_project_id: Option<String>,
    /// Warehouse dataset name
    pub bigquery_dataset: Option<String>,
    /// Request retry policy
    pub retry: RetryPolicy,
    /// Extraction volume settings
    pub extraction: ExtractionSettings,
}

impl std::fmt::Debug for EtlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are reported by presence only.
        f.debug_struct("EtlConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("base_url", &self.base_url)
            .field("data_dir", &self.data_dir)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("gcp_credentials", &self.gcp_credentials)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("bigquery_dataset", &self.bigquery_dataset)
            .field("retry", &self.retry)
            .field("extraction", &self.extraction)
            .finish()
    }
}

impl EtlConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "TMDB_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            retry_delay: Duration::from_millis(parse_or(
                &get,
                "TMDB_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )?),
            rate_limit_backoff: Duration::from_millis(parse_or(
                &get,
                "TMDB_RATE_LIMIT_BACKOFF_MS",
                DEFAULT_RATE_LIMIT_BACKOFF_MS,
            )?),
        };

        let extraction = ExtractionSettings {
            listing_pages: parse_or(&get, "TMDB_LISTING_PAGES", DEFAULT_LISTING_PAGES)?,
            page_pause: Duration::from_millis(parse_or(
                &get,
                "TMDB_PAGE_PAUSE_MS",
                DEFAULT_PAGE_PAUSE_MS,
            )?),
            detail_limit: parse_or(&get, "TMDB_DETAIL_LIMIT", DEFAULT_DETAIL_LIMIT)?,
        };

        Ok(Self {
            api_key: get("TMDB_API_KEY"),
            base_url: get("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            data_dir: get("TMDB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            database_url: get("DATABASE_URL"),
            gcp_credentials: get("GCP_CREDENTIALS").map(PathBuf::from),
            gcp_project_id: get("GCP_PROJECT_ID"),
            bigquery_dataset: get("BIGQUERY_DATASET"),
            retry,
            extraction,
        })
    }

    /// API key required by the extract phase
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        require(self.api_key.as_deref(), "TMDB_API_KEY")
    }

    /// Connection string required by the relational load
    pub fn require_database_url(&self) -> ConfigResult<&str> {
        require(self.database_url.as_deref(), "DATABASE_URL")
    }

    /// Warehouse settings required by every warehouse action
    pub fn require_warehouse(&self) -> ConfigResult<WarehouseConfig> {
        let credentials_path = self
            .gcp_credentials
            .clone()
            .ok_or_else(|| missing("GCP_CREDENTIALS"))?;
        let project_id = require(self.gcp_project_id.as_deref(), "GCP_PROJECT_ID")?;
        let dataset = require(self.bigquery_dataset.as_deref(), "BIGQUERY_DATASET")?;

        Ok(WarehouseConfig {
            credentials_path,
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        })
    }
}

fn missing(name: &str) -> ConfigError {
    ConfigError::ConfigMissing {
        name: name.to_string(),
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> ConfigResult<&'a str> {
    value.ok_or_else(|| missing(name))
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::ConfigInvalid {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
