//! Integration tests for the transform phase on the filesystem store

use std::fs;
use tempfile::TempDir;
use tmdb_etl::extractor::names;
use tmdb_etl::loader::TableSet;
use tmdb_etl::snapshot::{FsSnapshotStore, SnapshotError, SnapshotStore, Tier};
use tmdb_etl::transform::{run_transform, TransformError};

const DETAILS: &str = r#"[
  {"id": 1, "title": "A", "release_date": "1999-03-31", "runtime": 136,
   "vote_average": 8.2, "budget": 63000000, "original_language": "en",
   "genres": [{"id": 5, "name": "Action"}, {"id": 18, "name": "Drama"}]},
  {"id": 2, "title": "B, with comma", "overview": "Line one\nline two", "genres": []}
]"#;

const CREDITS: &str = r#"[
  {"id": 1,
   "cast": [{"id": 10, "name": "X", "character": "Y", "cast_id": 1, "gender": 2, "order": 0}],
   "crew": [{"id": 20, "name": "Z", "department": "Directing", "job": "Director"}]},
  {"id": 2, "cast": [], "crew": []}
]"#;

const GENRES: &str = r#"{"genres": [{"id": 5, "name": "Action"}, {"id": 18, "name": "Drama"}]}"#;

fn seeded_store() -> (TempDir, FsSnapshotStore) {
    let dir = TempDir::new().unwrap();
    let store = FsSnapshotStore::new(dir.path());
    store.put(Tier::Processed, names::DETAILS, DETAILS.as_bytes()).unwrap();
    store.put(Tier::Processed, names::CREDITS, CREDITS.as_bytes()).unwrap();
    store.put(Tier::Processed, names::GENRES, GENRES.as_bytes()).unwrap();
    (dir, store)
}

fn clean_file(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join("clean").join(name)).unwrap()
}

#[test]
fn test_transform_writes_five_tables() {
    let (dir, store) = seeded_store();
    let tables = run_transform(&store).unwrap();

    assert_eq!(
        tables.row_counts(),
        [
            ("movies", 2),
            ("genres", 2),
            ("movie_genres", 2),
            ("cast", 1),
            ("crew", 1)
        ]
    );

    let movie_genres = clean_file(&dir, "movie_genres.csv");
    assert_eq!(movie_genres, "movie_id,genre_id\n1,5\n1,18\n");

    let cast = clean_file(&dir, "cast.csv");
    assert_eq!(
        cast,
        "movie_id,cast_id,person_id,name,character,gender,order\n1,1,10,X,Y,2,0\n"
    );

    let movies = clean_file(&dir, "movies.csv");
    assert!(movies.starts_with("movie_id,title,original_title,overview,release_date,"));
    assert!(movies.contains("1,A,,,1999-03-31,136,,8.2,,63000000,,en\n"));
    assert!(movies.contains("\"B, with comma\""));
}

#[test]
fn test_transform_is_byte_identical_on_rerun() {
    let (dir, store) = seeded_store();
    run_transform(&store).unwrap();
    let first: Vec<String> = ["movies.csv", "genres.csv", "movie_genres.csv", "cast.csv", "crew.csv"]
        .iter()
        .map(|name| clean_file(&dir, name))
        .collect();

    run_transform(&store).unwrap();
    let second: Vec<String> = ["movies.csv", "genres.csv", "movie_genres.csv", "cast.csv", "crew.csv"]
        .iter()
        .map(|name| clean_file(&dir, name))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn test_clean_tables_read_back() {
    let (_dir, store) = seeded_store();
    let written = run_transform(&store).unwrap();

    let read = TableSet::read(&store).unwrap();
    assert_eq!(read, written);
    assert_eq!(
        read.movies[1].overview.as_deref(),
        Some("Line one\nline two")
    );
}

#[test]
fn test_missing_details_is_fatal() {
    let dir = TempDir::new().unwrap();
    let store = FsSnapshotStore::new(dir.path());
    store.put(Tier::Processed, names::GENRES, GENRES.as_bytes()).unwrap();

    let err = run_transform(&store).unwrap_err();
    match err {
        TransformError::Snapshot(SnapshotError::SnapshotMissing { path }) => {
            assert!(path.ends_with("details.json"), "path was {path}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("clean").exists());
}

#[test]
fn test_truncated_credits_is_malformed() {
    let (dir, store) = seeded_store();
    store
        .put(Tier::Processed, names::CREDITS, br#"[{"id": 1, "cast": ["#)
        .unwrap();

    let err = run_transform(&store).unwrap_err();
    assert!(matches!(
        err,
        TransformError::Snapshot(SnapshotError::SnapshotMalformed { ref path, .. })
            if path.ends_with("credits.json")
    ));
    assert!(!dir.path().join("clean").join("movies.csv").exists());
}

#[test]
fn test_detail_without_id_is_malformed() {
    let (_dir, store) = seeded_store();
    store
        .put(Tier::Processed, names::DETAILS, br#"[{"title": "no id"}]"#)
        .unwrap();

    let err = run_transform(&store).unwrap_err();
    assert!(matches!(
        err,
        TransformError::Snapshot(SnapshotError::SnapshotMalformed { .. })
    ));
}
