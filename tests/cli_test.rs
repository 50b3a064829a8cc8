//! CLI tests
//!
//! Argument parsing plus the list management commands run against a
//! throwaway data directory.

use std::path::PathBuf;

use clap::Parser;

use camkiosk::cli::{
    AddCmd, CheckCmd, Cli, Command, ConfigCmd, ExitCode, ListCmd, Output, RemoveCmd,
};
use camkiosk::commands::{add_cmd, check_cmd, config_cmd, list_cmd, remove_cmd};
use camkiosk::source::CamStore;
use camkiosk::{Config, StreamDescriptor, StreamKind};

// =============================================================================
// Test Helpers
// =============================================================================

fn temp_config() -> Config {
    let mut config = Config::default();
    config.source.data_dir =
        std::env::temp_dir().join(format!("camkiosk-cli-{}", uuid::Uuid::new_v4()));
    config.source.url = None;
    config
}

fn quiet() -> Output {
    Output {
        json: true,
        quiet: true,
    }
}

fn add(id: &str, kind: StreamKind, url: &str) -> AddCmd {
    AddCmd {
        id: id.to_string(),
        name: id.to_uppercase(),
        kind,
        url: url.to_string(),
        dwell: None,
        attribution: None,
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Test: `ls` and `rm` aliases
#[test]
fn test_aliases() {
    let cli = Cli::parse_from(["camkiosk", "ls", "--health"]);
    assert!(matches!(cli.command, Some(Command::List(ListCmd { health: true }))));

    let cli = Cli::parse_from(["camkiosk", "rm", "feeder"]);
    match cli.command {
        Some(Command::Remove(cmd)) => assert_eq!(cmd.id, "feeder"),
        other => panic!("Expected Remove command, got {:?}", other),
    }
}

/// Test: kind accepts the legacy names
#[test]
fn test_add_kind_aliases() {
    for (arg, kind) in [
        ("youtube", StreamKind::Embedded),
        ("embedded", StreamKind::Embedded),
        ("hls", StreamKind::Adaptive),
        ("web", StreamKind::Page),
    ] {
        let cli = Cli::parse_from(["camkiosk", "add", "x", "X", arg, "https://x.example"]);
        match cli.command {
            Some(Command::Add(cmd)) => assert_eq!(cmd.kind, kind),
            other => panic!("Expected Add command, got {:?}", other),
        }
    }
}

/// Test: add requires all positional arguments
#[test]
fn test_add_missing_url() {
    assert!(Cli::try_parse_from(["camkiosk", "add", "x", "X", "hls"]).is_err());
}

/// Test: run is kiosk mode, management commands are CLI mode
#[test]
fn test_modes() {
    assert!(!Cli::parse_from(["camkiosk", "run"]).is_cli_mode());
    assert!(Cli::parse_from(["camkiosk", "check"]).is_cli_mode());
    assert!(Cli::parse_from(["camkiosk", "config", "--write"]).is_cli_mode());
    assert!(Cli::parse_from(["camkiosk", "--json"]).should_json());
}

// =============================================================================
// Commands
// =============================================================================

/// Test: add, list and remove round through cams.json
#[tokio::test]
async fn test_add_list_remove() {
    let config = temp_config();
    let out = quiet();

    let mut cmd = add("feeder", StreamKind::Adaptive, "https://cams.example.org/feeder.m3u8");
    cmd.dwell = Some(45);
    assert_eq!(add_cmd(cmd, &config, &out), ExitCode::Success);
    assert_eq!(
        add_cmd(add("map", StreamKind::Page, "https://example.org/map"), &config, &out),
        ExitCode::Success
    );

    let list = CamStore::new(config.cams_path()).read();
    assert_eq!(list.len(), 2);
    assert_eq!(list.streams[0].dwell_seconds, Some(45));

    assert_eq!(list_cmd(ListCmd { health: false }, &config, &out).await, ExitCode::Success);

    let rm = RemoveCmd { id: "feeder".into() };
    assert_eq!(remove_cmd(rm, &config, &out), ExitCode::Success);
    assert_eq!(CamStore::new(config.cams_path()).read().len(), 1);

    let _ = std::fs::remove_dir_all(&config.source.data_dir);
}

/// Test: add replaces an existing id instead of duplicating it
#[test]
fn test_add_replaces_same_id() {
    let config = temp_config();
    let out = quiet();

    add_cmd(add("a", StreamKind::Page, "https://one.example"), &config, &out);
    add_cmd(add("a", StreamKind::Page, "https://two.example"), &config, &out);

    let list = CamStore::new(config.cams_path()).read();
    assert_eq!(list.len(), 1);
    assert_eq!(list.streams[0].url, "https://two.example");
    let _ = std::fs::remove_dir_all(&config.source.data_dir);
}

/// Test: bad input maps to InvalidArgs and writes nothing
#[test]
fn test_add_invalid() {
    let config = temp_config();
    let out = quiet();

    assert_eq!(
        add_cmd(add("a", StreamKind::Page, "not a url"), &config, &out),
        ExitCode::InvalidArgs
    );

    let mut blank = add("a", StreamKind::Page, "https://a.example");
    blank.name = "  ".into();
    assert_eq!(add_cmd(blank, &config, &out), ExitCode::InvalidArgs);

    let mut zero = add("a", StreamKind::Page, "https://a.example");
    zero.dwell = Some(0);
    assert_eq!(add_cmd(zero, &config, &out), ExitCode::InvalidArgs);

    assert!(!config.cams_path().exists());
}

/// Test: removing an unknown id is NotFound
#[test]
fn test_remove_unknown() {
    let config = temp_config();
    let rm = RemoveCmd { id: "ghost".into() };
    assert_eq!(remove_cmd(rm, &config, &quiet()), ExitCode::NotFound);
}

/// Test: empty list exits with NoStreams
#[tokio::test]
async fn test_list_and_check_empty() {
    let config = temp_config();
    assert_eq!(list_cmd(ListCmd { health: false }, &config, &quiet()).await, ExitCode::NoStreams);
    assert_eq!(check_cmd(CheckCmd {}, &config, &quiet()).await, ExitCode::NoStreams);
}

/// Test: check reports unreachable streams with a non-zero exit
#[tokio::test]
async fn test_check_reports_down() {
    let config = temp_config();
    let store = CamStore::new(config.cams_path());
    store
        .upsert(StreamDescriptor::new("broken", "Broken", StreamKind::Page, "::nope::"))
        .unwrap();

    assert_eq!(check_cmd(CheckCmd {}, &config, &quiet()).await, ExitCode::NetworkError);
    let _ = std::fs::remove_dir_all(&config.source.data_dir);
}

/// Test: config --write saves a file that loads back
#[test]
fn test_config_write_roundtrip() {
    let mut config = temp_config();
    config.kiosk.default_dwell_secs = 42;
    let path: PathBuf = config.source.data_dir.join("config.toml");

    let code = config_cmd(ConfigCmd { write: true }, &config, Some(&path), &quiet());
    assert_eq!(code, ExitCode::Success);

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.kiosk.default_dwell_secs, 42);

    assert_eq!(
        config_cmd(ConfigCmd { write: false }, &config, None, &quiet()),
        ExitCode::Success
    );
    let _ = std::fs::remove_dir_all(&config.source.data_dir);
}
