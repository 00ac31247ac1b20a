//! BigQuery full-refresh loader
//!
//! Authenticates with a service-account key: an RS256-signed JWT assertion is
//! exchanged for an OAuth2 access token, which is then used against the BigQuery
//! REST API. Tables are loaded with multipart upload load jobs
//! (`WRITE_TRUNCATE`), then polled until the job reports `DONE`. Named
//! analytical queries run through `jobs.query` with the same token.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{columns_for, LoadError, LoadResult, LoadSummary, LoadTarget, TableLoad};
use crate::analytics::QueryRows;
use crate::config::WarehouseConfig;
use crate::snapshot::{SnapshotStore, Tier};
use crate::transform::records::{Column, ColumnKind, TABLE_LOAD_ORDER};

const TARGET: &str = "bigquery";

/// Location used when creating the dataset
pub const DATASET_LOCATION: &str = "EU";

const BIGQUERY_API: &str = "https://bigquery.googleapis.com/bigquery/v2";
const BIGQUERY_UPLOAD_API: &str = "https://bigquery.googleapis.com/upload/bigquery/v2";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);
const JOB_POLL_MAX: u32 = 150;
const MULTIPART_BOUNDARY: &str = "tmdb_etl_load_boundary";
const QUERY_WAIT_MS: u64 = 10_000;

/// Fields of a service-account JSON key used for token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account e-mail (JWT issuer)
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Key id placed in the JWT header
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Read and parse a key file
    pub fn from_file(path: &Path) -> LoadResult<Self> {
        if !path.is_file() {
            return Err(LoadError::unreachable(
                TARGET,
                format!("credentials file not found: {}", path.display()),
            ));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LoadError::unreachable(TARGET, format!("reading {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            LoadError::unreachable(TARGET, format!("parsing {}: {e}", path.display()))
        })
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// JWT claims for the service-account assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

impl AssertionClaims {
    /// Claims for `key` issued at `now` (unix seconds)
    pub fn new(key: &ServiceAccountKey, now: i64) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: BIGQUERY_SCOPE.to_string(),
            aud: key.token_uri().to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign the assertion for `key`
pub fn build_assertion(key: &ServiceAccountKey, now: i64) -> LoadResult<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| LoadError::unreachable(TARGET, format!("invalid private key: {e}")))?;
    encode(&header, &AssertionClaims::new(key, now), &encoding_key)
        .map_err(|e| LoadError::unreachable(TARGET, format!("signing assertion: {e}")))
}

/// BigQuery field type for a column
pub fn field_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "INT64",
        ColumnKind::Float => "FLOAT64",
        ColumnKind::Text => "STRING",
        ColumnKind::Date => "DATE",
    }
}

/// Load job resource for one table
pub fn load_job_config(project: &str, dataset: &str, table: &str, columns: &[Column]) -> Value {
    let fields: Vec<Value> = columns
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "type": field_type(c.kind),
                "mode": if c.nullable { "NULLABLE" } else { "REQUIRED" },
            })
        })
        .collect();

    json!({
        "configuration": {
            "load": {
                "destinationTable": {
                    "projectId": project,
                    "datasetId": dataset,
                    "tableId": table,
                },
                "schema": { "fields": fields },
                "sourceFormat": "CSV",
                "skipLeadingRows": 1,
                "allowQuotedNewlines": true,
                "writeDisposition": "WRITE_TRUNCATE",
                "createDisposition": "CREATE_IF_NEEDED",
            }
        }
    })
}

/// `multipart/related` body carrying the job resource and the CSV payload
pub fn multipart_body(metadata: &Value, csv: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(csv.len() + 1024);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(csv);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Outcome of one poll of a load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Still pending or running
    Running,
    /// Finished; rows written if reported
    Done(Option<u64>),
    /// Finished with an error result
    Failed(String),
}

/// Interpret a job resource returned by `jobs.get` or `jobs.insert`
pub fn job_state(job: &Value) -> JobState {
    let status = &job["status"];
    if status["state"].as_str() != Some("DONE") {
        return JobState::Running;
    }
    if let Some(message) = status["errorResult"]["message"].as_str() {
        return JobState::Failed(message.to_string());
    }
    let rows = job["statistics"]["load"]["outputRows"]
        .as_str()
        .and_then(|s| s.parse().ok());
    JobState::Done(rows)
}

/// Error for a non-2xx API response, `None` when the call is worth retrying
///
/// Only server errors are transient. Authentication failures end the wait as
/// unreachable, any other client error as rejected.
pub fn status_failure(context: &str, status: u16, body: &str) -> Option<LoadError> {
    let cause = format!("{context} returned {status}: {body}");
    match status {
        500..=599 => None,
        401 | 403 => Some(LoadError::unreachable(TARGET, cause)),
        _ => Some(LoadError::rejected(TARGET, cause)),
    }
}

/// `jobs.query` request body for a standard-SQL statement
pub fn query_request(sql: &str) -> Value {
    json!({
        "query": sql,
        "useLegacySql": false,
        "location": DATASET_LOCATION,
        "timeoutMs": QUERY_WAIT_MS,
    })
}

/// Warehouse loader
pub struct BigQueryLoader {
    http: Client,
    config: WarehouseConfig,
    key: ServiceAccountKey,
}

impl BigQueryLoader {
    /// Read the service-account key named by `config`
    ///
    /// # Errors
    /// [`LoadError::LoadTargetUnreachable`] if the key file is missing or unreadable.
    pub fn new(config: WarehouseConfig) -> LoadResult<Self> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LoadError::unreachable(TARGET, e))?;
        Ok(Self { http, config, key })
    }

    fn dataset_ref(&self) -> String {
        format!("{}.{}", self.config.project_id, self.config.dataset)
    }

    async fn access_token(&self) -> LoadResult<String> {
        let assertion = build_assertion(&self.key, Utc::now().timestamp())?;
        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LoadError::unreachable(
                TARGET,
                format!("token exchange failed ({status}): {text}"),
            ));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, format!("token response: {e}")))?;
        debug!("Obtained access token");
        Ok(token.access_token)
    }

    /// `None` when the dataset does not exist
    async fn get_dataset(&self, token: &str) -> LoadResult<Option<Value>> {
        let url = format!(
            "{BIGQUERY_API}/projects/{}/datasets/{}",
            self.config.project_id, self.config.dataset
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        match response.status().as_u16() {
            404 => Ok(None),
            s if (200..300).contains(&s) => response
                .json()
                .await
                .map(Some)
                .map_err(|e| LoadError::rejected(TARGET, e)),
            s => {
                let text = response.text().await.unwrap_or_default();
                Err(LoadError::unreachable(
                    TARGET,
                    format!("dataset {} returned {s}: {text}", self.dataset_ref()),
                ))
            }
        }
    }

    /// Credentials readable, token obtainable and dataset accessible
    pub async fn test_connection(&self) -> LoadResult<()> {
        info!(credentials = %self.config.credentials_path.display(), "Credentials file found");
        let token = self.access_token().await?;
        info!("Access token obtained");

        match self.get_dataset(&token).await? {
            Some(_) => {
                info!(dataset = %self.dataset_ref(), "Dataset accessible");
                Ok(())
            }
            None => Err(LoadError::unreachable(
                TARGET,
                format!("dataset not found: {}", self.dataset_ref()),
            )),
        }
    }

    /// Create the dataset in [`DATASET_LOCATION`] unless it exists
    ///
    /// Returns whether it was created.
    pub async fn create_dataset_if_absent(&self) -> LoadResult<bool> {
        let token = self.access_token().await?;
        if self.get_dataset(&token).await?.is_some() {
            info!(dataset = %self.config.dataset, "Dataset already exists");
            return Ok(false);
        }

        let url = format!("{BIGQUERY_API}/projects/{}/datasets", self.config.project_id);
        let body = json!({
            "datasetReference": {
                "projectId": self.config.project_id,
                "datasetId": self.config.dataset,
            },
            "location": DATASET_LOCATION,
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LoadError::rejected(
                TARGET,
                format!("dataset creation failed ({status}): {text}"),
            ));
        }
        info!(dataset = %self.config.dataset, location = DATASET_LOCATION, "Dataset created");
        Ok(true)
    }

    /// Replace one table with `csv` (header row included) and wait for the job
    pub async fn load_table(
        &self,
        token: &str,
        table: &str,
        columns: &[Column],
        csv: &[u8],
    ) -> LoadResult<u64> {
        let metadata = load_job_config(
            &self.config.project_id,
            &self.config.dataset,
            table,
            columns,
        );
        let url = format!(
            "{BIGQUERY_UPLOAD_API}/projects/{}/jobs?uploadType=multipart",
            self.config.project_id
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_body(&metadata, csv))
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LoadError::rejected(
                TARGET,
                format!("load job for {table} refused ({status}): {text}"),
            ));
        }
        let job: Value = response
            .json()
            .await
            .map_err(|e| LoadError::rejected(TARGET, e))?;
        let job_id = job["jobReference"]["jobId"]
            .as_str()
            .ok_or_else(|| LoadError::rejected(TARGET, "load job response without jobId"))?
            .to_string();
        let location = job["jobReference"]["location"]
            .as_str()
            .unwrap_or(DATASET_LOCATION)
            .to_string();
        debug!(table, job_id = %job_id, "Load job submitted");

        let mut state = job_state(&job);
        let mut polls = 0;
        loop {
            match state {
                JobState::Done(rows) => {
                    let rows = rows.unwrap_or(0);
                    info!(table, rows, "Table loaded");
                    return Ok(rows);
                }
                JobState::Failed(message) => {
                    return Err(LoadError::rejected(
                        TARGET,
                        format!("load job for {table} failed: {message}"),
                    ));
                }
                JobState::Running if polls >= JOB_POLL_MAX => {
                    return Err(LoadError::rejected(
                        TARGET,
                        format!("load job {job_id} for {table} did not finish"),
                    ));
                }
                JobState::Running => {
                    tokio::time::sleep(JOB_POLL_INTERVAL).await;
                    polls += 1;
                    state = self.poll_job(token, &job_id, &location).await?;
                }
            }
        }
    }

    async fn poll_job(&self, token: &str, job_id: &str, location: &str) -> LoadResult<JobState> {
        let url = format!(
            "{BIGQUERY_API}/projects/{}/jobs/{job_id}",
            self.config.project_id
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("location", location)])
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status_failure(&format!("polling job {job_id}"), status.as_u16(), &text) {
                Some(err) => Err(err),
                None => {
                    warn!(job_id, %status, "Job poll failed, retrying");
                    Ok(JobState::Running)
                }
            };
        }
        let job: Value = response
            .json()
            .await
            .map_err(|e| LoadError::rejected(TARGET, e))?;
        Ok(job_state(&job))
    }

    /// Run a standard-SQL query and collect every result page
    pub async fn run_query(&self, sql: &str) -> LoadResult<QueryRows> {
        let token = self.access_token().await?;
        let url = format!("{BIGQUERY_API}/projects/{}/queries", self.config.project_id);
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&query_request(sql))
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_failure("query", status.as_u16(), &text).unwrap_or_else(|| {
                LoadError::unreachable(TARGET, format!("query returned {status}: {text}"))
            }));
        }
        let mut page: Value = response
            .json()
            .await
            .map_err(|e| LoadError::rejected(TARGET, e))?;
        let job_id = page["jobReference"]["jobId"]
            .as_str()
            .ok_or_else(|| LoadError::rejected(TARGET, "query response without jobId"))?
            .to_string();
        let location = page["jobReference"]["location"]
            .as_str()
            .unwrap_or(DATASET_LOCATION)
            .to_string();
        debug!(job_id = %job_id, "Query submitted");

        let mut polls = 0;
        while page["jobComplete"].as_bool() != Some(true) {
            if polls >= JOB_POLL_MAX {
                return Err(LoadError::rejected(
                    TARGET,
                    format!("query job {job_id} did not finish"),
                ));
            }
            polls += 1;
            if let Some(next) = self.query_results(&token, &job_id, &location, None).await? {
                page = next;
            }
        }

        let mut rows = QueryRows::from_response(&page);
        while let Some(page_token) = page["pageToken"].as_str().map(str::to_string) {
            if polls >= JOB_POLL_MAX {
                return Err(LoadError::rejected(
                    TARGET,
                    format!("query job {job_id} results did not finish paging"),
                ));
            }
            polls += 1;
            if let Some(next) = self
                .query_results(&token, &job_id, &location, Some(&page_token))
                .await?
            {
                rows.rows.extend(QueryRows::from_response(&next).rows);
                page = next;
            }
        }

        info!(job_id = %job_id, rows = rows.rows.len(), "Query finished");
        Ok(rows)
    }

    /// One `getQueryResults` call; `None` on a transient server error
    async fn query_results(
        &self,
        token: &str,
        job_id: &str,
        location: &str,
        page_token: Option<&str>,
    ) -> LoadResult<Option<Value>> {
        let url = format!(
            "{BIGQUERY_API}/projects/{}/queries/{job_id}",
            self.config.project_id
        );
        let wait = QUERY_WAIT_MS.to_string();
        let mut query = vec![("location", location), ("timeoutMs", wait.as_str())];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token));
        }
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .map_err(|e| LoadError::unreachable(TARGET, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status_failure(&format!("query job {job_id}"), status.as_u16(), &text) {
                Some(err) => Err(err),
                None => {
                    warn!(job_id, %status, "Query results unavailable, retrying");
                    tokio::time::sleep(JOB_POLL_INTERVAL).await;
                    Ok(None)
                }
            };
        }
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| LoadError::rejected(TARGET, e))
    }
}

#[async_trait]
impl LoadTarget for BigQueryLoader {
    fn name(&self) -> &'static str {
        TARGET
    }

    async fn load_tables(&self, store: &dyn SnapshotStore) -> LoadResult<LoadSummary> {
        // Read every table first so a missing file fails before any job runs.
        let mut payloads = Vec::with_capacity(TABLE_LOAD_ORDER.len());
        for table in TABLE_LOAD_ORDER {
            let bytes = store.get(Tier::Clean, &format!("{table}.csv"))?;
            let columns = columns_for(table)
                .ok_or_else(|| LoadError::rejected(TARGET, format!("unknown table {table}")))?;
            payloads.push((table, columns, bytes));
        }

        let token = self.access_token().await?;
        let mut tables = Vec::with_capacity(payloads.len());
        for (table, columns, bytes) in payloads {
            let rows = self.load_table(&token, table, columns, &bytes).await?;
            tables.push(TableLoad {
                table: table.to_string(),
                rows,
            });
        }

        Ok(LoadSummary {
            target: TARGET.to_string(),
            tables,
        })
    }
}
