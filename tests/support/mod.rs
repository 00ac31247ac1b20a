//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tmdb_etl::config::RetryPolicy;
use tmdb_etl::fetcher::{FetcherError, FetcherResult, HttpTransport, RawResponse, TmdbHttpClient};

/// Base URL every mock client is built with
pub const BASE_URL: &str = "http://catalog.test/3";

/// One request seen by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Path relative to [`BASE_URL`]
    pub path: String,
    /// Query pairs, credential included
    pub query: Vec<(String, String)>,
}

impl SeenRequest {
    /// Value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport answering from per-path response scripts
///
/// Each path replays its script in order; the last entry repeats forever.
/// Unknown paths answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<FetcherResult<RawResponse>>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the responses for `path`
    pub fn route(self, path: &str, responses: Vec<FetcherResult<RawResponse>>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), responses.into());
        self
    }

    /// Every request so far, in order
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests made to `path`
    pub fn count(&self, path: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        _headers: &[(String, String)],
    ) -> FetcherResult<RawResponse> {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url).to_string();
        self.seen.lock().unwrap().push(SeenRequest {
            path: path.clone(),
            query: query.to_vec(),
        });

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap(),
            None => Ok(RawResponse::new(404, r#"{"status_message":"not found"}"#)),
        }
    }
}

/// 200 with a JSON body
pub fn ok(body: Value) -> FetcherResult<RawResponse> {
    Ok(RawResponse::new(200, body.to_string()))
}

/// Bare status with an empty JSON object body
pub fn status(code: u16) -> FetcherResult<RawResponse> {
    Ok(RawResponse::new(code, "{}"))
}

/// Connection-level failure
pub fn network_error() -> FetcherResult<RawResponse> {
    Err(FetcherError::Transport("connection reset".to_string()))
}

/// Client over `transport` with no backoff waits
pub fn client(transport: Arc<MockTransport>, max_attempts: u32) -> TmdbHttpClient {
    TmdbHttpClient::new(
        transport,
        BASE_URL,
        "test-key",
        RetryPolicy::immediate(max_attempts),
    )
}
