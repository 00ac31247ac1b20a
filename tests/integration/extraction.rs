//! Integration tests for the extraction phase against a scripted catalog

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tmdb_etl::config::ExtractionSettings;
use tmdb_etl::extractor::{names, DetailFetchReport, ExtractError, Extractor, RunManifest};
use tmdb_etl::fetcher::FetcherError;
use tmdb_etl::snapshot::{self, MemorySnapshotStore, SnapshotStore, Tier};
use tmdb_etl::ListingKind;

use crate::support::{self, ok, status, MockTransport};

fn settings(detail_limit: usize) -> ExtractionSettings {
    ExtractionSettings {
        listing_pages: 2,
        page_pause: Duration::ZERO,
        detail_limit,
    }
}

fn listing(ids: &[i64]) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Movie {id}")}))
        .collect();
    json!({"page": 1, "total_pages": 1, "results": results})
}

fn detail(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {id}"),
        "release_date": "2024-05-01",
        "genres": [{"id": 28, "name": "Action"}],
    })
}

fn credits(id: i64) -> Value {
    json!({
        "id": id,
        "cast": [{"id": id * 100, "name": "Lead", "cast_id": 1, "order": 0}],
        "crew": [{"id": id * 100 + 1, "name": "Boss", "department": "Directing", "job": "Director"}],
    })
}

/// Catalog with popular ids 1, 2, 3 where movie 2's detail always fails
fn catalog() -> Arc<MockTransport> {
    let mut transport = MockTransport::new()
        .route("/movie/popular", vec![ok(listing(&[1, 2, 3]))])
        .route("/movie/top_rated", vec![ok(listing(&[4]))])
        .route("/movie/upcoming", vec![ok(listing(&[]))])
        .route("/trending/movie/week", vec![ok(listing(&[3, 1]))])
        .route(
            "/genre/movie/list",
            vec![ok(json!({"genres": [{"id": 28, "name": "Action"}]}))],
        )
        .route("/movie/2", vec![status(500)]);
    for id in [1, 3] {
        transport = transport
            .route(&format!("/movie/{id}"), vec![ok(detail(id))])
            .route(&format!("/movie/{id}/credits"), vec![ok(credits(id))]);
    }
    Arc::new(transport)
}

fn extractor(transport: Arc<MockTransport>, store: Arc<MemorySnapshotStore>, limit: usize) -> Extractor {
    Extractor::new(support::client(transport, 2), store, settings(limit))
}

#[tokio::test]
async fn test_full_extraction_writes_every_snapshot() {
    let transport = catalog();
    let store = Arc::new(MemorySnapshotStore::new());
    let report = extractor(transport.clone(), store.clone(), 50)
        .run_full_extraction()
        .await
        .unwrap();

    assert_eq!(report.requested, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed_ids(), vec![2]);
    assert_eq!(report.failed[0].stage, "detail");

    let mut raw = store.names(Tier::Raw);
    raw.sort();
    assert_eq!(
        raw,
        vec![
            "genres.json",
            "manifest.json",
            "popular.json",
            "top_rated.json",
            "trending.json",
            "upcoming.json",
        ]
    );

    let details: Vec<Value> =
        snapshot::read_json(store.as_ref(), Tier::Processed, names::DETAILS).unwrap();
    let ids: Vec<i64> = details.iter().map(|d| d["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);

    let stored: DetailFetchReport =
        snapshot::read_json(store.as_ref(), Tier::Processed, names::DETAILS_REPORT).unwrap();
    assert_eq!(stored, report);

    // Credits for movie 2 are never requested once its detail fails.
    assert_eq!(transport.count("/movie/2"), 2);
    assert_eq!(transport.count("/movie/2/credits"), 0);
}

#[tokio::test]
async fn test_detail_limit_takes_leading_popular_ids() {
    let transport = catalog();
    let store = Arc::new(MemorySnapshotStore::new());
    let report = extractor(transport.clone(), store.clone(), 1)
        .run_full_extraction()
        .await
        .unwrap();

    assert_eq!(report.requested, 1);
    assert!(report.is_complete());
    assert_eq!(transport.count("/movie/3"), 0);
}

#[tokio::test]
async fn test_listing_snapshot_is_concatenated_results() {
    let transport = catalog();
    let store = Arc::new(MemorySnapshotStore::new());
    extractor(transport, store.clone(), 0)
        .extract_listing(ListingKind::Trending)
        .await
        .unwrap();

    let text = store.text(Tier::Raw, "trending.json").unwrap();
    let saved: Vec<Value> = serde_json::from_str(&text).unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0]["id"], 3);
    // Pretty-printed
    assert!(text.contains('\n'));
}

#[tokio::test]
async fn test_manifest_records_run() {
    let store = Arc::new(MemorySnapshotStore::new());
    extractor(catalog(), store.clone(), 50)
        .run_full_extraction()
        .await
        .unwrap();

    let manifest = RunManifest::load(store.as_ref()).unwrap();
    assert!(manifest.finished_at().is_some());
    let summary = manifest.details().unwrap();
    assert_eq!((summary.requested, summary.succeeded, summary.failed), (3, 2, 1));
    assert!(manifest
        .documents()
        .iter()
        .any(|d| d.tier == "processed" && d.name == names::CREDITS));
}

#[tokio::test]
async fn test_listing_failure_aborts_extraction() {
    let transport = Arc::new(MockTransport::new().route("/movie/popular", vec![status(429)]));
    let store = Arc::new(MemorySnapshotStore::new());

    let err = extractor(transport, store.clone(), 50)
        .run_full_extraction()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractError::Fetch(FetcherError::ApiRequestExhausted {
            last_status: Some(429),
            ..
        })
    ));
    assert!(!store.exists(Tier::Raw, "popular.json"));
    assert!(!store.exists(Tier::Raw, names::MANIFEST));
}

#[tokio::test]
async fn test_genre_dictionary_written_to_both_tiers() {
    let store = Arc::new(MemorySnapshotStore::new());
    let dictionary = extractor(catalog(), store.clone(), 0)
        .extract_genre_dictionary()
        .await
        .unwrap();

    assert_eq!(dictionary.genres.len(), 1);
    assert!(store.exists(Tier::Raw, names::GENRES));
    assert!(store.exists(Tier::Processed, names::GENRES));
}
