//! Smoke tests for the `skin-updater` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn skin_updater() -> Command {
    let mut cmd = Command::cargo_bin("skin-updater").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    skin_updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--skins-path"))
        .stdout(predicate::str::contains("--skip-self-update"))
        .stdout(predicate::str::contains("--no-pause"));
}

#[test]
fn test_version() {
    skin_updater()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_verbose_conflicts_with_quiet() {
    skin_updater().args(["--verbose", "--quiet"]).assert().failure();
}

#[test]
fn test_missing_skins_path_exits_with_failure() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("faults.log");
    let config = temp.path().join("config.toml");
    std::fs::write(&config, format!("log_file = {:?}\n", log.display().to_string())).unwrap();

    skin_updater()
        .arg("--config")
        .arg(&config)
        .arg("--skins-path")
        .arg(temp.path().join("no-such-skins"))
        .args(["--skip-self-update", "--no-pause", "--no-progress"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("skins path does not exist"));

    let recorded = std::fs::read_to_string(&log).unwrap();
    assert!(recorded.contains("skins path does not exist"));
}

#[test]
fn test_invalid_config_exits_with_failure() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "theme_name = [").unwrap();

    skin_updater()
        .arg("--config")
        .arg(&config)
        .arg("--no-pause")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_init_config_writes_defaults() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("nested").join("config.toml");

    skin_updater()
        .arg("--config")
        .arg(&config)
        .arg("--init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote configuration"));

    let written = std::fs::read_to_string(&config).unwrap();
    assert!(written.contains("theme_name = \"Metro for Steam\""));
    assert!(written.contains("[upgrade]"));
}
