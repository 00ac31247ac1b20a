//! Nested-JSON to relational normalization
//!
//! Reads the processed snapshots (`details.json`, `credits.json`, `genres.json`)
//! and flattens them into five tables:
//!
//! - `movies` - one row per detail record
//! - `genres` - one row per dictionary genre
//! - `movie_genres` - one row per (movie, embedded genre) pair
//! - `cast` / `crew` - one row per credit entry
//!
//! Row order follows input order: outer loop over records, inner loop over the
//! nested list. The output is a pure function of the three inputs, so re-running
//! on the same snapshots yields byte-identical CSV.

pub mod records;

use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::extractor::names;
use crate::output::{self, OutputError};
use crate::snapshot::{self, SnapshotError, SnapshotStore, Tier};
use crate::{GenreDictionary, ItemCredits, ItemDetail};
use records::{CastRow, CrewRow, GenreRow, MovieGenreRow, MovieRow, TableRecord};

/// Transform errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// Input snapshot missing, malformed, or output not writable
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Table could not be encoded
    #[error("table encoding failed: {0}")]
    Csv(#[from] OutputError),
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// The five normalized tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTables {
    /// One row per movie
    pub movies: Vec<MovieRow>,
    /// Genre dictionary
    pub genres: Vec<GenreRow>,
    /// Movie to genre links
    pub movie_genres: Vec<MovieGenreRow>,
    /// Cast credits
    pub cast: Vec<CastRow>,
    /// Crew credits
    pub crew: Vec<CrewRow>,
}

impl NormalizedTables {
    /// Row count per table, in load order
    pub fn row_counts(&self) -> [(&'static str, usize); 5] {
        [
            (MovieRow::TABLE, self.movies.len()),
            (GenreRow::TABLE, self.genres.len()),
            (MovieGenreRow::TABLE, self.movie_genres.len()),
            (CastRow::TABLE, self.cast.len()),
            (CrewRow::TABLE, self.crew.len()),
        ]
    }
}

/// Flatten detail, credit and genre records into the five tables
///
/// `movies` and `movie_genres` follow detail order, `cast` and `crew` follow
/// credits order. Genre links outside the dictionary and credits without a
/// detail record are kept and logged.
pub fn normalize(
    details: &[ItemDetail],
    credits: &[ItemCredits],
    genres: &GenreDictionary,
) -> NormalizedTables {
    let mut tables = NormalizedTables {
        genres: genres
            .genres
            .iter()
            .map(|g| GenreRow {
                genre_id: g.id,
                name: g.name.clone(),
            })
            .collect(),
        ..Default::default()
    };

    let known_genres: HashSet<i64> = genres.genres.iter().map(|g| g.id).collect();
    for detail in details {
        tables.movies.push(movie_row(detail));

        for genre in detail.genres.iter().flatten() {
            if !known_genres.contains(&genre.id) {
                warn!(
                    movie_id = detail.id,
                    genre_id = genre.id,
                    "Genre link not in dictionary"
                );
            }
            tables.movie_genres.push(MovieGenreRow {
                movie_id: detail.id,
                genre_id: genre.id,
            });
        }
    }

    let detail_ids: HashSet<i64> = details.iter().map(|d| d.id).collect();
    for record in credits {
        if !detail_ids.contains(&record.id) {
            warn!(movie_id = record.id, "Credits without a detail record");
        }
        for entry in record.cast.iter().flatten() {
            tables.cast.push(CastRow {
                movie_id: record.id,
                cast_id: entry.cast_id,
                person_id: entry.id,
                name: entry.name.clone(),
                character: entry.character.clone(),
                gender: entry.gender,
                order: entry.order,
            });
        }
        for entry in record.crew.iter().flatten() {
            tables.crew.push(CrewRow {
                movie_id: record.id,
                person_id: entry.id,
                name: entry.name.clone(),
                department: entry.department.clone(),
                job: entry.job.clone(),
            });
        }
    }

    tables
}

fn movie_row(detail: &ItemDetail) -> MovieRow {
    MovieRow {
        movie_id: detail.id,
        title: detail.title.clone(),
        original_title: detail.original_title.clone(),
        overview: detail.overview.clone(),
        release_date: release_date(detail),
        runtime: detail.runtime,
        popularity: detail.popularity,
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        budget: detail.budget,
        revenue: detail.revenue,
        original_language: detail.original_language.clone(),
    }
}

/// Release date as `YYYY-MM-DD`; blank or unparseable values become null
fn release_date(detail: &ItemDetail) -> Option<String> {
    let raw = detail.release_date.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
        Err(_) => {
            warn!(movie_id = detail.id, release_date = raw, "Unparseable release date dropped");
            None
        }
    }
}

/// Read the processed-tier snapshots and normalize them
///
/// # Errors
/// [`SnapshotError::SnapshotMissing`] or [`SnapshotError::SnapshotMalformed`]
/// naming the offending document. Nothing is written.
pub fn normalize_snapshots(store: &dyn SnapshotStore) -> TransformResult<NormalizedTables> {
    let details: Vec<ItemDetail> = snapshot::read_json(store, Tier::Processed, names::DETAILS)?;
    let credits: Vec<ItemCredits> = snapshot::read_json(store, Tier::Processed, names::CREDITS)?;
    let genres: GenreDictionary = snapshot::read_json(store, Tier::Processed, names::GENRES)?;

    info!(
        details = details.len(),
        credits = credits.len(),
        genres = genres.genres.len(),
        "Normalizing snapshots"
    );
    Ok(normalize(&details, &credits, &genres))
}

/// Write all five tables to the clean tier
///
/// Every table is encoded before the first one is written.
pub fn write_tables(store: &dyn SnapshotStore, tables: &NormalizedTables) -> TransformResult<()> {
    let encoded = [
        (MovieRow::file_name(), output::encode_table(&tables.movies)?),
        (GenreRow::file_name(), output::encode_table(&tables.genres)?),
        (
            MovieGenreRow::file_name(),
            output::encode_table(&tables.movie_genres)?,
        ),
        (CastRow::file_name(), output::encode_table(&tables.cast)?),
        (CrewRow::file_name(), output::encode_table(&tables.crew)?),
    ];

    for (name, bytes) in &encoded {
        store.put(Tier::Clean, name, bytes)?;
    }

    for (table, rows) in tables.row_counts() {
        info!(table, rows, "Table written");
    }
    Ok(())
}

/// Normalize the processed snapshots and write the clean tables
pub fn run_transform(store: &dyn SnapshotStore) -> TransformResult<NormalizedTables> {
    let tables = normalize_snapshots(store)?;
    write_tables(store, &tables)?;
    Ok(tables)
}
