//! # TMDB ETL Library
//!
//! A batch pipeline that pulls movie metadata from the TMDB v3 catalog API,
//! flattens the nested JSON into relational tables, and loads those tables into
//! PostgreSQL and BigQuery for analytical queries.
//!
//! ## Features
//!
//! - **Resilient Client**: One bounded retry budget covering rate limits (429) and
//!   other failures, each with its own backoff
//! - **Pagination**: Page-budgeted listing fetches that stop at the API-reported page count
//! - **Partial Completion**: Per-movie detail/credit outcomes collected into a report
//! - **Snapshots**: Raw JSON persisted through an injectable [`snapshot::SnapshotStore`]
//! - **Normalization**: Deterministic movies/genres/movie_genres/cast/crew tables
//! - **Full-Refresh Loads**: Drop-and-recreate into PostgreSQL, truncate-and-reload into BigQuery
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmdb_etl::config::EtlConfig;
//! use tmdb_etl::extractor::Extractor;
//! use tmdb_etl::snapshot::FsSnapshotStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EtlConfig::from_env()?;
//! let store = Arc::new(FsSnapshotStore::new(config.data_dir.clone()));
//! let extractor = Extractor::from_config(&config, store)?;
//!
//! let report = extractor.run_full_extraction().await?;
//! println!("{} of {} movies fetched", report.succeeded, report.requested);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Explicit run configuration sourced from the environment
//! - [`fetcher`] - HTTP client with retry policy, and the paginator
//! - [`extractor`] - Snapshot orchestration for listings, genres and per-movie details
//! - [`snapshot`] - Path-addressed document store (filesystem or in-memory)
//! - [`transform`] - JSON-to-relational normalization
//! - [`output`] - CSV table encoding
//! - [`loader`] - PostgreSQL and BigQuery load targets
//! - [`analytics`] - Named warehouse queries
//! - [`cli`] - Command-line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named analytical queries
pub mod analytics;

/// CLI command implementations
pub mod cli;

/// Run configuration
pub mod config;

/// Extraction orchestration
pub mod extractor;

/// Catalog API client and pagination
pub mod fetcher;

/// Full-refresh load targets
pub mod loader;

/// Table encoders
pub mod output;

/// Snapshot persistence between phases
pub mod snapshot;

/// Nested-JSON to relational normalization
pub mod transform;

/// Listing endpoints that are snapshotted on every run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    /// Currently popular movies
    Popular,
    /// Highest rated movies
    TopRated,
    /// Upcoming releases
    Upcoming,
    /// Weekly trending movies
    Trending,
}

impl ListingKind {
    /// All listing kinds in extraction order
    pub const ALL: [ListingKind; 4] = [
        ListingKind::Popular,
        ListingKind::TopRated,
        ListingKind::Upcoming,
        ListingKind::Trending,
    ];

    /// Snapshot document name for this listing (e.g. `top_rated.json`)
    pub fn snapshot_name(&self) -> String {
        format!("{self}.json")
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListingKind::Popular => "popular",
            ListingKind::TopRated => "top_rated",
            ListingKind::Upcoming => "upcoming",
            ListingKind::Trending => "trending",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ListingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(ListingKind::Popular),
            "top_rated" => Ok(ListingKind::TopRated),
            "upcoming" => Ok(ListingKind::Upcoming),
            "trending" => Ok(ListingKind::Trending),
            _ => Err(format!("Invalid listing kind: {s}")),
        }
    }
}

/// One entry of a listing page (`results[]`)
///
/// Only the id is required; the rest of the summary is kept verbatim in the raw
/// snapshot and never normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSummary {
    /// Catalog movie id
    pub id: i64,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Popularity score
    #[serde(default)]
    pub popularity: Option<f64>,
}

/// Genre reference embedded in a movie detail record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreRef {
    /// Genre id (foreign key into the genre dictionary)
    pub id: i64,
    /// Genre name as embedded in the detail record
    #[serde(default)]
    pub name: Option<String>,
}

/// Full metadata for one movie (`/movie/{id}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ItemDetail {
    /// Catalog movie id
    pub id: i64,
    /// Localized title
    #[serde(default)]
    pub title: Option<String>,
    /// Original-language title
    #[serde(default)]
    pub original_title: Option<String>,
    /// Plot overview
    #[serde(default)]
    pub overview: Option<String>,
    /// Release date (YYYY-MM-DD, sometimes an empty string upstream)
    #[serde(default)]
    pub release_date: Option<String>,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime: Option<i64>,
    /// Popularity score
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Average vote
    #[serde(default)]
    pub vote_average: Option<f64>,
    /// Number of votes
    #[serde(default)]
    pub vote_count: Option<i64>,
    /// Production budget (USD)
    #[serde(default)]
    pub budget: Option<i64>,
    /// Box office revenue (USD)
    #[serde(default)]
    pub revenue: Option<i64>,
    /// ISO 639-1 original language
    #[serde(default)]
    pub original_language: Option<String>,
    /// Embedded genre references
    #[serde(default)]
    pub genres: Option<Vec<GenreRef>>,
}

/// Cast entry of a credits record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CastEntry {
    /// Person id
    #[serde(default)]
    pub id: Option<i64>,
    /// Cast slot id within the movie
    #[serde(default)]
    pub cast_id: Option<i64>,
    /// Person name
    #[serde(default)]
    pub name: Option<String>,
    /// Character played
    #[serde(default)]
    pub character: Option<String>,
    /// Gender code (0 unknown, 1 female, 2 male, 3 non-binary)
    #[serde(default)]
    pub gender: Option<i64>,
    /// Billing order
    #[serde(default)]
    pub order: Option<i64>,
}

/// Crew entry of a credits record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CrewEntry {
    /// Person id
    #[serde(default)]
    pub id: Option<i64>,
    /// Person name
    #[serde(default)]
    pub name: Option<String>,
    /// Department (e.g. "Directing")
    #[serde(default)]
    pub department: Option<String>,
    /// Job title (e.g. "Director")
    #[serde(default)]
    pub job: Option<String>,
}

/// Cast and crew for one movie (`/movie/{id}/credits`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ItemCredits {
    /// Catalog movie id
    pub id: i64,
    /// Cast listing
    #[serde(default)]
    pub cast: Option<Vec<CastEntry>>,
    /// Crew listing
    #[serde(default)]
    pub crew: Option<Vec<CrewEntry>>,
}

/// Entry of the global genre dictionary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    /// Genre id
    pub id: i64,
    /// Genre name
    #[serde(default)]
    pub name: Option<String>,
}

/// Genre dictionary document (`/genre/movie/list`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreDictionary {
    /// Every known movie genre
    pub genres: Vec<Genre>,
}
