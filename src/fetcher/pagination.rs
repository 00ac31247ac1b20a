//! Pagination helper for catalog listing endpoints
//!
//! Listing endpoints are page-numbered (`page=1..`) and report `total_pages` in
//! every response. The helper walks pages in order until either the page budget
//! or the reported page count is reached, concatenating each page's `results`.
//!
//! Safety mechanisms:
//! - Page budget is clamped to the API's maximum accepted page
//! - A page without `results` contributes nothing instead of failing
//! - The inter-page pause is skipped after the final request

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetcher::tmdb_config::MAX_API_PAGE;
use crate::fetcher::tmdb_http::TmdbHttpClient;
use crate::fetcher::FetcherResult;

/// Pagination helper for catalog listing requests
pub struct PaginationHelper;

impl PaginationHelper {
    /// Fetch up to `max_pages` pages of `endpoint` and concatenate their results
    ///
    /// # Arguments
    /// * `client` - Catalog client
    /// * `endpoint` - Listing path (e.g., "/movie/popular")
    /// * `max_pages` - Page budget; `0` issues no request
    /// * `params` - Extra query parameters merged into every page request
    /// * `page_pause` - Wait between consecutive page requests
    ///
    /// # Errors
    /// The first client failure aborts pagination and is returned unchanged.
    pub async fn fetch_all_pages(
        client: &TmdbHttpClient,
        endpoint: &str,
        max_pages: u32,
        params: &[(&str, String)],
        page_pause: Duration,
    ) -> FetcherResult<Vec<Value>> {
        let budget = if max_pages > MAX_API_PAGE {
            warn!(
                endpoint,
                requested = max_pages,
                clamped = MAX_API_PAGE,
                "Page budget exceeds the API maximum, clamping"
            );
            MAX_API_PAGE
        } else {
            max_pages
        };

        let mut all_results = Vec::new();

        for page in 1..=budget {
            let mut page_params: Vec<(&str, String)> =
                params.iter().filter(|(k, _)| *k != "page").cloned().collect();
            page_params.push(("page", page.to_string()));

            debug!(endpoint, page, budget, "Fetching listing page");

            let body = client.fetch(endpoint, &page_params).await?;

            let results = match body.get("results").and_then(Value::as_array) {
                Some(items) => items.clone(),
                None => {
                    debug!(endpoint, page, "Page has no results array");
                    Vec::new()
                }
            };
            debug!(endpoint, page, items = results.len(), "Received listing page");
            all_results.extend(results);

            let total_pages = body
                .get("total_pages")
                .and_then(Value::as_u64)
                .unwrap_or(1);

            if u64::from(page) >= total_pages {
                debug!(endpoint, page, total_pages, "Reached last reported page");
                break;
            }

            if page < budget && !page_pause.is_zero() {
                tokio::time::sleep(page_pause).await;
            }
        }

        debug!(
            endpoint,
            total = all_results.len(),
            "Pagination completed"
        );

        Ok(all_results)
    }
}
