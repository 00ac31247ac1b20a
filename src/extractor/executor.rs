//! Extraction executor
//!
//! Sequential by construction: one catalog request in flight at a time, with the
//! client's retry policy and the paginator's inter-page pause as the only pacing.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::manifest::RunManifest;
use super::names;
use super::report::{DetailFetchReport, FailedItem, ItemOutcome};
use super::ExtractResult;
use crate::config::{EtlConfig, ExtractionSettings};
use crate::fetcher::tmdb_config::TMDB_ENDPOINTS;
use crate::fetcher::{FetcherError, PaginationHelper, TmdbHttpClient};
use crate::snapshot::{self, SnapshotStore, Tier};
use crate::{GenreDictionary, ItemSummary, ListingKind};

/// Orchestrates listing, genre and per-movie extraction
pub struct Extractor {
    client: TmdbHttpClient,
    store: Arc<dyn SnapshotStore>,
    settings: ExtractionSettings,
    show_progress: bool,
}

impl Extractor {
    /// Create an extractor over an existing client and store
    pub fn new(
        client: TmdbHttpClient,
        store: Arc<dyn SnapshotStore>,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            client,
            store,
            settings,
            show_progress: false,
        }
    }

    /// Build the production client from configuration
    ///
    /// # Errors
    /// [`super::ExtractError::Config`] if `TMDB_API_KEY` is not set.
    pub fn from_config(config: &EtlConfig, store: Arc<dyn SnapshotStore>) -> ExtractResult<Self> {
        let client = TmdbHttpClient::from_config(config)?;
        Ok(Self::new(client, store, config.extraction))
    }

    /// Show a progress bar over the detail batch
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Snapshot store in use
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Fetch one listing and write it to the raw tier
    ///
    /// Returns the concatenated `results` entries.
    pub async fn extract_listing(&self, kind: ListingKind) -> ExtractResult<Vec<Value>> {
        let endpoint = TMDB_ENDPOINTS.listing(kind);
        info!(listing = %kind, endpoint, pages = self.settings.listing_pages, "Extracting listing");

        let results = PaginationHelper::fetch_all_pages(
            &self.client,
            endpoint,
            self.settings.listing_pages,
            &[],
            self.settings.page_pause,
        )
        .await?;

        let name = kind.snapshot_name();
        snapshot::write_json(self.store.as_ref(), Tier::Raw, &name, &results)?;
        info!(listing = %kind, items = results.len(), "Listing saved");
        Ok(results)
    }

    /// Fetch the genre dictionary and write it to the raw and processed tiers
    pub async fn extract_genre_dictionary(&self) -> ExtractResult<GenreDictionary> {
        let endpoint = TMDB_ENDPOINTS.genre_list;
        info!(endpoint, "Extracting genre dictionary");

        let body = self.client.fetch(endpoint, &[]).await?;
        let dictionary: GenreDictionary =
            serde_json::from_value(body.clone()).map_err(|e| FetcherError::InvalidResponse {
                endpoint: endpoint.to_string(),
                cause: e.to_string(),
            })?;

        snapshot::write_json(self.store.as_ref(), Tier::Raw, names::GENRES, &body)?;
        snapshot::write_json(self.store.as_ref(), Tier::Processed, names::GENRES, &body)?;
        info!(genres = dictionary.genres.len(), "Genre dictionary saved");
        Ok(dictionary)
    }

    /// Fetch detail then credits for one movie
    pub async fn fetch_item(&self, id: i64) -> ItemOutcome {
        let detail = match self.client.fetch(&TMDB_ENDPOINTS.movie_detail(id), &[]).await {
            Ok(detail) => detail,
            Err(e) => return failed(id, "detail", &e),
        };
        match self.client.fetch(&TMDB_ENDPOINTS.movie_credits(id), &[]).await {
            Ok(credits) => ItemOutcome::Fetched { id, detail, credits },
            Err(e) => failed(id, "credits", &e),
        }
    }

    /// Fetch detail and credits for each id, in order
    ///
    /// Successful pairs are written to `details.json` and `credits.json` in the
    /// processed tier in input order. Failed ids are reported, never fatal. The
    /// report itself is written as `details_report.json`.
    ///
    /// # Errors
    /// Only snapshot write failures abort the batch.
    pub async fn extract_item_details_and_credits(
        &self,
        ids: &[i64],
    ) -> ExtractResult<DetailFetchReport> {
        info!(count = ids.len(), "Extracting movie details and credits");

        let progress = self.create_progress_bar(ids.len() as u64);
        let mut report = DetailFetchReport::default();
        let mut details = Vec::with_capacity(ids.len());
        let mut credits = Vec::with_capacity(ids.len());

        for &id in ids {
            progress.set_message(format!("movie {id}"));
            let outcome = self.fetch_item(id).await;
            report.record(&outcome);
            match outcome {
                ItemOutcome::Fetched {
                    detail,
                    credits: item_credits,
                    ..
                } => {
                    debug!(id, "Movie fetched");
                    details.push(detail);
                    credits.push(item_credits);
                }
                ItemOutcome::Failed(failed) => {
                    warn!(id, stage = %failed.stage, error = %failed.error, "Movie skipped");
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let store = self.store.as_ref();
        snapshot::write_json(store, Tier::Processed, names::DETAILS, &details)?;
        snapshot::write_json(store, Tier::Processed, names::CREDITS, &credits)?;
        snapshot::write_json(store, Tier::Processed, names::DETAILS_REPORT, &report)?;

        info!(
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Detail batch complete"
        );
        Ok(report)
    }

    /// Listings, genres, then details for the leading popular ids
    ///
    /// Writes `manifest.json` to the raw tier on completion.
    pub async fn run_full_extraction(&self) -> ExtractResult<DetailFetchReport> {
        let mut manifest = RunManifest::start();

        for kind in ListingKind::ALL {
            self.extract_listing(kind).await?;
            manifest.add_document(Tier::Raw, &kind.snapshot_name());
        }

        self.extract_genre_dictionary().await?;
        manifest.add_document(Tier::Raw, names::GENRES);
        manifest.add_document(Tier::Processed, names::GENRES);

        let popular: Vec<Value> = snapshot::read_json(
            self.store.as_ref(),
            Tier::Raw,
            &ListingKind::Popular.snapshot_name(),
        )?;
        let ids = leading_ids(&popular, self.settings.detail_limit);

        let report = self.extract_item_details_and_credits(&ids).await?;
        manifest.add_document(Tier::Processed, names::DETAILS);
        manifest.add_document(Tier::Processed, names::CREDITS);
        manifest.add_document(Tier::Processed, names::DETAILS_REPORT);

        manifest.finish(&report);
        manifest.save(self.store.as_ref())?;

        Ok(report)
    }

    fn create_progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("hardcoded template is valid")
                .progress_chars("#>-"),
        );
        pb
    }
}

fn failed(id: i64, stage: &str, error: &FetcherError) -> ItemOutcome {
    ItemOutcome::Failed(FailedItem {
        id,
        stage: stage.to_string(),
        error: error.to_string(),
    })
}

/// Ids of the first `limit` listing entries, skipping entries without an id
pub fn leading_ids(listing: &[Value], limit: usize) -> Vec<i64> {
    listing
        .iter()
        .filter_map(|entry| match serde_json::from_value::<ItemSummary>(entry.clone()) {
            Ok(summary) => Some(summary.id),
            Err(e) => {
                warn!(error = %e, "Listing entry without usable id skipped");
                None
            }
        })
        .take(limit)
        .collect()
}
