//! CLI integration tests for the gs binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `gs` command isolated from the user's config, logs and cache
fn gs(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gs").expect("gs binary should build");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env("NO_COLOR", "1")
        .env_remove("GEARSCOUT_LLM_PROVIDER")
        .env_remove("GEARSCOUT_LLM_MODEL");
    cmd
}

fn write_config(home: &Path, body: &str) -> std::path::PathBuf {
    let path = home.join("gearscout.yml");
    fs::write(&path, body).expect("Failed to write config");
    path
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().expect("Failed to create temp dir");
    gs(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("research"))
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("Logs are written to"));
}

#[test]
fn test_config_prints_effective_yaml() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(home.path(), "llm:\n  provider: openai\nnegotiation:\n  max-rounds: 3\n");

    gs(home.path())
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("provider: openai"))
        .stdout(predicate::str::contains("max-rounds: 3"))
        .stdout(predicate::str::contains("ttl-hours: 4"));
}

#[test]
fn test_local_config_file_is_picked_up() {
    let home = TempDir::new().expect("Failed to create temp dir");
    fs::write(home.path().join(".gearscout.yml"), "search:\n  max-results: 7\n").expect("Failed to write config");

    gs(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-results: 7"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().expect("Failed to create temp dir");
    gs(home.path())
        .args(["config", "--config", "does-not-exist.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_cache_stats_and_clear() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let cache_dir = home.path().join("search-cache");
    fs::create_dir_all(&cache_dir).expect("Failed to create cache dir");
    fs::write(cache_dir.join("stale.json"), "not an entry").expect("Failed to write entry");
    let config = write_config(home.path(), &format!("cache:\n  dir: {}\n", cache_dir.display()));

    gs(home.path())
        .args(["cache", "stats", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 1 (1 expired)"));

    gs(home.path())
        .args(["cache", "clear", "--expired", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 expired entries"));

    gs(home.path())
        .args(["cache", "clear", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 entries"));
}

#[test]
fn test_cache_disabled() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(home.path(), "cache:\n  enabled: false\n");

    gs(home.path())
        .args(["cache", "stats", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache is disabled"));
}

#[test]
fn test_research_without_api_key_names_the_variable() {
    let home = TempDir::new().expect("Failed to create temp dir");
    gs(home.path())
        .args(["research", "a gaming laptop"])
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("PERPLEXITY_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"))
        .stderr(predicate::str::contains("Hint:"));
}
