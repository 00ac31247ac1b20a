//! End-to-end tests for the tmdb-etl binary
//!
//! Every test runs in a scratch directory with the pipeline's environment
//! variables removed, so no `.env` file or developer credentials leak in.

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "TMDB_API_KEY",
    "TMDB_BASE_URL",
    "TMDB_DATA_DIR",
    "TMDB_MAX_ATTEMPTS",
    "DATABASE_URL",
    "GCP_CREDENTIALS",
    "GCP_PROJECT_ID",
    "BIGQUERY_DATASET",
    "RUST_LOG",
    "LOG_FORMAT",
];

fn tmdb_etl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tmdb-etl").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}

fn seed_processed(data_dir: &std::path::Path) {
    let processed = data_dir.join("processed");
    fs::create_dir_all(&processed).unwrap();
    fs::write(
        processed.join("details.json"),
        r#"[{"id":1,"title":"A","genres":[{"id":5,"name":"Action"}]},{"id":2,"title":"B","genres":[]}]"#,
    )
    .unwrap();
    fs::write(
        processed.join("credits.json"),
        r#"[{"id":1,"cast":[{"id":10,"name":"X","character":"Y","cast_id":1,"gender":2,"order":0}],"crew":[]}]"#,
    )
    .unwrap();
    fs::write(
        processed.join("genres.json"),
        r#"{"genres":[{"id":5,"name":"Action"}]}"#,
    )
    .unwrap();
}

#[test]
fn test_warehouse_without_action_prints_usage() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir).arg("warehouse").assert().success();

    let stdout = stdout_of(&assert);
    assert!(stdout.contains("No action specified"), "stdout: {stdout}");
    assert!(stdout.contains("--create-dataset"));
}

#[test]
fn test_warehouse_conflicting_actions_rejected() {
    let dir = TempDir::new().unwrap();
    tmdb_etl(&dir)
        .args(["warehouse", "--test", "--load"])
        .assert()
        .failure();
}

#[test]
fn test_warehouse_test_requires_credentials() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir)
        .args(["warehouse", "--test"])
        .assert()
        .failure()
        .code(1);
    assert!(stderr_of(&assert).contains("GCP_CREDENTIALS"));
}

#[test]
fn test_warehouse_unknown_query_names_available_queries() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir)
        .args(["warehouse", "--query", "MOST_WATCHED"])
        .assert()
        .failure()
        .code(1);

    let stderr = stderr_of(&assert);
    assert!(stderr.contains("unknown query"), "stderr: {stderr}");
    assert!(stderr.contains("ENGAGEMENT_SCORE"));
    assert!(!stderr.contains("GCP_CREDENTIALS"));
}

#[test]
fn test_extract_without_api_key_fails_before_io() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir)
        .args(["extract", "--data-dir"])
        .arg(dir.path().join("data"))
        .assert()
        .failure()
        .code(1);

    assert!(stderr_of(&assert).contains("TMDB_API_KEY"));
    assert!(!dir.path().join("data").exists());
}

#[test]
fn test_load_db_without_database_url_fails() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir).arg("load-db").assert().failure().code(1);
    assert!(stderr_of(&assert).contains("DATABASE_URL"));
}

#[test]
fn test_transform_writes_clean_tables() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    seed_processed(&data_dir);

    let assert = tmdb_etl(&dir)
        .args(["transform", "--output-format", "json", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success();

    let output: serde_json::Value = serde_json::from_str(stdout_of(&assert).trim()).unwrap();
    assert_eq!(output["phase"], "transform");
    assert_eq!(output["rows"]["movies"], 2);
    assert_eq!(output["rows"]["movie_genres"], 1);
    assert_eq!(output["rows"]["crew"], 0);

    let crew = fs::read_to_string(data_dir.join("clean").join("crew.csv")).unwrap();
    assert_eq!(crew, "movie_id,person_id,name,department,job\n");
}

#[test]
fn test_transform_data_dir_from_environment() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("snapshots");
    seed_processed(&data_dir);

    tmdb_etl(&dir)
        .arg("transform")
        .env("TMDB_DATA_DIR", &data_dir)
        .assert()
        .success();

    assert!(data_dir.join("clean").join("movies.csv").exists());
}

#[test]
fn test_transform_without_snapshots_fails() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir)
        .args(["transform", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1);
    assert!(stderr_of(&assert).contains("details.json"));
}

#[test]
fn test_invalid_numeric_setting_fails() {
    let dir = TempDir::new().unwrap();
    let assert = tmdb_etl(&dir)
        .arg("transform")
        .env("TMDB_MAX_ATTEMPTS", "many")
        .assert()
        .failure()
        .code(1);
    assert!(stderr_of(&assert).contains("TMDB_MAX_ATTEMPTS"));
}
