//! Unit tests for command-line parsing

use clap::Parser;
use std::path::PathBuf;
use tmdb_etl::cli::{Cli, Commands, OutputFormat, WarehouseAction};

#[test]
fn test_subcommands_parse() {
    for (arg, expected) in [
        ("extract", "Extract"),
        ("transform", "Transform"),
        ("load-db", "LoadDb"),
        ("run", "Run"),
        ("warehouse", "Warehouse"),
    ] {
        let cli = Cli::try_parse_from(["tmdb-etl", arg]).unwrap();
        assert!(
            format!("{:?}", cli.command).starts_with(expected),
            "{arg} parsed as {:?}",
            cli.command
        );
    }
}

#[test]
fn test_defaults_when_flags_omitted() {
    let cli = Cli::parse_from(["tmdb-etl", "extract"]);
    assert_eq!(cli.data_dir, None);
    assert_eq!(cli.max_attempts, None);
    assert_eq!(cli.output_format, OutputFormat::Human);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::parse_from([
        "tmdb-etl",
        "transform",
        "--data-dir",
        "snapshots",
        "--output-format",
        "json",
    ]);
    assert_eq!(cli.data_dir, Some(PathBuf::from("snapshots")));
    assert_eq!(cli.output_format, OutputFormat::Json);
}

#[test]
fn test_max_attempts_bounds() {
    let cli = Cli::parse_from(["tmdb-etl", "--max-attempts", "20", "run"]);
    assert_eq!(cli.max_attempts, Some(20));
    assert!(Cli::try_parse_from(["tmdb-etl", "--max-attempts", "0", "run"]).is_err());
    assert!(Cli::try_parse_from(["tmdb-etl", "--max-attempts", "abc", "run"]).is_err());
}

#[test]
fn test_warehouse_actions_exclusive() {
    let cli = Cli::parse_from(["tmdb-etl", "warehouse", "--create-dataset"]);
    match cli.command {
        Commands::Warehouse(args) => {
            assert_eq!(args.action(), Some(WarehouseAction::CreateDataset))
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let err = Cli::try_parse_from(["tmdb-etl", "warehouse", "--test", "--create-dataset"])
        .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn test_unknown_output_format_rejected() {
    assert!(Cli::try_parse_from(["tmdb-etl", "--output-format", "xml", "extract"]).is_err());
}
