//! Tests for config loading, flag overrides and the explore command.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use quards::cli::{Cli, Commands, RunStatus, cmd_explore};
use quards::config::{QuardsConfig, StorageConfig};
use quards_core::{GameId, QuardsError, StorageBackend};
use std::path::Path;

const CARDS: &str = r#"[
    {"Unique_ID": "A", "Name": "Alpha", "Cost": 1, "Inkable": true, "Lore": 1},
    {"Unique_ID": "B", "Name": "Beta", "Cost": 2, "Inkable": false, "Lore": 2}
]"#;

fn write_lorcana_files(dir: &Path) -> String {
    std::fs::write(dir.join("cards.json"), CARDS).unwrap();
    std::fs::write(dir.join("p1.dek"), "14 Alpha\n6 Beta\n").unwrap();
    std::fs::write(dir.join("p2.dek"), "10 Alpha\n10 Beta\n").unwrap();
    format!(
        r#"
[storage]
backend = "redb"
database = "{db}"

[explore]
max_depth = 2

[lorcana]
cards = "{cards}"
deck1 = "{deck1}"
deck2 = "{deck2}"
"#,
        db = dir.join("quards.redb").display(),
        cards = dir.join("cards.json").display(),
        deck1 = dir.join("p1.dek").display(),
        deck2 = dir.join("p2.dek").display(),
    )
}

// =============================================================================
// CONFIG FILE TESTS
// =============================================================================

#[test]
fn test_missing_default_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = QuardsConfig::load(&dir.path().join("quards.toml"), false).unwrap();
    assert_eq!(config, QuardsConfig::default());
    assert_eq!(config.storage.backend, "redb");
    assert_eq!(config.explore.max_depth, 10);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = QuardsConfig::load(&dir.path().join("nope.toml"), true);
    assert!(matches!(result, Err(QuardsError::ConfigError(_))));
}

#[test]
fn test_partial_tables_keep_defaults() {
    let config = QuardsConfig::from_toml_str(
        r#"
[explore]
workers = 4
"#,
    )
    .unwrap();
    assert_eq!(config.explore.workers, 4);
    assert_eq!(config.explore.max_depth, 10);
    assert_eq!(config.storage, StorageConfig::default());
}

#[test]
fn test_invalid_explore_settings_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quards.toml");
    std::fs::write(&path, "[explore]\nworkers = 0\n").unwrap();
    assert!(QuardsConfig::load(&path, true).is_err());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = QuardsConfig::from_toml_str("[explore\nmax_depth = ");
    assert!(matches!(result, Err(QuardsError::ConfigError(_))));
}

#[test]
fn test_storage_backends() {
    let memory = StorageConfig {
        backend: "memory".to_string(),
        ..StorageConfig::default()
    };
    assert!(!memory.open().unwrap().is_persistent());

    let unknown = StorageConfig {
        backend: "sqlite".to_string(),
        ..StorageConfig::default()
    };
    assert!(matches!(unknown.open(), Err(QuardsError::ConfigError(_))));
}

#[test]
fn test_lorcana_files_load() {
    let dir = tempfile::tempdir().unwrap();
    let text = write_lorcana_files(dir.path());
    let config = QuardsConfig::from_toml_str(&text).unwrap();

    let cards = config.lorcana.load_cards().unwrap();
    assert_eq!(cards.len(), 2);
    let setup = config.lorcana.load_setup(&cards).unwrap();
    assert_eq!(setup.deck1.len(), 20);
    assert_eq!(setup.deck2.len(), 20);
}

// =============================================================================
// CLI TESTS
// =============================================================================

#[test]
fn test_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quards.toml");
    std::fs::write(&path, "[storage]\nbackend = \"redb\"\ndatabase = \"file.redb\"\n").unwrap();

    let cli = Cli::try_parse_from([
        "quards",
        "-c",
        path.to_str().unwrap(),
        "-B",
        "memory",
        "-D",
        "other.redb",
        "-g",
        "seed-7",
        "explore",
        "--max-depth",
        "3",
        "--resume",
    ])
    .unwrap();

    let settings = cli.settings().unwrap();
    assert_eq!(settings.storage.backend, "memory");
    assert_eq!(settings.storage.database, Path::new("other.redb"));
    assert_eq!(cli.game_id(), GameId::new("seed-7"));
    match cli.command {
        Some(Commands::Explore {
            max_depth,
            workers,
            resume,
            ..
        }) => {
            assert_eq!(max_depth, Some(3));
            assert_eq!(workers, None);
            assert!(resume);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_summary_requires_turn() {
    assert!(Cli::try_parse_from(["quards", "summary"]).is_err());
    assert!(Cli::try_parse_from(["quards", "summary", "--turn", "2"]).is_ok());
}

// =============================================================================
// EXPLORE COMMAND TESTS
// =============================================================================

#[tokio::test]
async fn test_explore_then_resume() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = QuardsConfig::from_toml_str(&write_lorcana_files(dir.path())).unwrap();
    let game = GameId::new("seed-1");

    cmd_explore(&config, game.clone(), true, false).await.unwrap();
    let first = RunStatus::collect(&config.storage.open().unwrap(), &game).unwrap();
    assert!(first.states >= 3);
    assert_eq!(first.claimed, 0);
    assert_eq!(first.frontier_turn, Some(2));

    config.explore.max_depth = 3;
    config.explore.workers = 2;
    cmd_explore(&config, game.clone(), true, true).await.unwrap();
    let second = RunStatus::collect(&config.storage.open().unwrap(), &game).unwrap();
    assert!(second.states > first.states);
    assert!(second.closed > first.closed);
    assert_eq!(second.frontier_turn, Some(3));
}

#[test]
fn test_status_of_empty_store() {
    let status = RunStatus::collect(&StorageBackend::default(), &GameId::new("x")).unwrap();
    assert_eq!(status, RunStatus::default());
}
