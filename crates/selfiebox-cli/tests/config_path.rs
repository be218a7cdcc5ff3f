use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", dir.path())
        .env_remove("SELFIEBOX_CONFIG")
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            dir.path().join("config.toml").to_str().unwrap(),
        ));
}

#[test]
fn test_config_path_respects_override() {
    let dir = tempdir().unwrap();
    let custom = dir.path().join("elsewhere.toml");

    cargo_bin_cmd!("selfiebox")
        .args(["--config", custom.to_str().unwrap(), "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("elsewhere.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", dir.path())
        .env_remove("SELFIEBOX_CONFIG")
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[segmentation]"));
    assert!(contents.contains("# max_concurrent ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", dir.path())
        .env_remove("SELFIEBOX_CONFIG")
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[compositor]\nmax_concurrent = 0\n").unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", dir.path())
        .env_remove("SELFIEBOX_CONFIG")
        .env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("SELFIEBOX_TELEGRAM_BOT_TOKEN")
        .arg("bot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("load config"));
}

#[test]
fn test_bot_without_token_fails_fast() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", dir.path())
        .env_remove("SELFIEBOX_CONFIG")
        .env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("SELFIEBOX_TELEGRAM_BOT_TOKEN")
        .arg("bot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bot_token"));
}
