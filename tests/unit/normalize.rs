//! Unit tests for JSON-to-table normalization

use tmdb_etl::transform::normalize;
use tmdb_etl::transform::records::MovieGenreRow;
use tmdb_etl::{GenreDictionary, ItemCredits, ItemDetail};

fn genres() -> GenreDictionary {
    serde_json::from_str(r#"{"genres":[{"id":5,"name":"Action"},{"id":18,"name":"Drama"}]}"#)
        .unwrap()
}

#[test]
fn test_movie_genres_from_embedded_lists() {
    let details: Vec<ItemDetail> = serde_json::from_str(
        r#"[{"id":1,"title":"A","genres":[{"id":5,"name":"Action"}]},{"id":2,"title":"B","genres":[]}]"#,
    )
    .unwrap();

    let tables = normalize(&details, &[], &genres());

    assert_eq!(
        tables.movie_genres,
        vec![MovieGenreRow {
            movie_id: 1,
            genre_id: 5
        }]
    );
    assert_eq!(tables.movies.len(), 2);
    assert_eq!(tables.movies[0].movie_id, 1);
    assert_eq!(tables.movies[1].movie_id, 2);
    assert_eq!(tables.movies[1].title.as_deref(), Some("B"));
}

#[test]
fn test_cast_and_crew_from_credits() {
    let details: Vec<ItemDetail> = serde_json::from_str(r#"[{"id":1,"title":"A"}]"#).unwrap();
    let credits: Vec<ItemCredits> = serde_json::from_str(
        r#"[{"id":1,"cast":[{"id":10,"name":"X","character":"Y","cast_id":1,"gender":2,"order":0}],"crew":[]}]"#,
    )
    .unwrap();

    let tables = normalize(&details, &credits, &genres());

    assert_eq!(tables.cast.len(), 1);
    let row = &tables.cast[0];
    assert_eq!(row.movie_id, 1);
    assert_eq!(row.person_id, Some(10));
    assert_eq!(row.name.as_deref(), Some("X"));
    assert_eq!(row.character.as_deref(), Some("Y"));
    assert_eq!(row.gender, Some(2));
    assert!(tables.crew.is_empty());
}

#[test]
fn test_missing_keys_map_to_none() {
    let details: Vec<ItemDetail> =
        serde_json::from_str(r#"[{"id":7,"title":"Sparse","release_date":""}]"#).unwrap();

    let tables = normalize(&details, &[], &genres());
    let movie = &tables.movies[0];

    assert_eq!(movie.overview, None);
    assert_eq!(movie.release_date, None);
    assert_eq!(movie.vote_count, None);
    assert_eq!(movie.revenue, None);
    assert!(tables.movie_genres.is_empty());
}

#[test]
fn test_genre_dictionary_becomes_genres_table() {
    let tables = normalize(&[], &[], &genres());
    let ids: Vec<i64> = tables.genres.iter().map(|g| g.genre_id).collect();
    assert_eq!(ids, vec![5, 18]);
    assert_eq!(tables.genres[1].name.as_deref(), Some("Drama"));
}

#[test]
fn test_normalize_is_deterministic() {
    let details: Vec<ItemDetail> = serde_json::from_str(
        r#"[{"id":3,"genres":[{"id":18}]},{"id":1,"genres":[{"id":5},{"id":18}]}]"#,
    )
    .unwrap();
    let credits: Vec<ItemCredits> = serde_json::from_str(
        r#"[{"id":1,"cast":[{"id":1},{"id":2}],"crew":[{"id":3,"job":"Writer"}]},{"id":3}]"#,
    )
    .unwrap();

    let first = normalize(&details, &credits, &genres());
    let second = normalize(&details, &credits, &genres());
    assert_eq!(first, second);

    let pairs: Vec<(i64, i64)> = first
        .movie_genres
        .iter()
        .map(|l| (l.movie_id, l.genre_id))
        .collect();
    assert_eq!(pairs, vec![(3, 18), (1, 5), (1, 18)]);
}
