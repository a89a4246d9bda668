//! CLI integration tests for the kestrel binary.
//!
//! These tests cover argument parsing and configuration checking only; none
//! of them start the server.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

/// Get a command for the kestrel binary with a clean environment.
fn kestrel() -> Command {
    let mut cmd = Command::cargo_bin("kestrel").unwrap();
    cmd.env_remove("KESTREL_API_KEY")
        .env_remove("KESTREL_BIND")
        .env_remove("KESTREL_PROVIDER_URL")
        .env_remove("KESTREL_CONFIG");
    cmd
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    kestrel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("caching MCP gateway"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--log-dir"));
}

#[test]
fn test_version_displays() {
    kestrel()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kestrel"));
}

#[test]
fn test_unknown_flag_rejected() {
    kestrel().arg("--frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Checks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_check_valid_config() {
    let file = config_file(
        r#"
        [server]
        bind = "127.0.0.1:9300"

        [cache.families.search]
        ttl_secs = 120
        "#,
    );

    kestrel()
        .arg("--check")
        .arg("--config")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("127.0.0.1:9300"))
        .stdout(predicate::str::contains("cache search: ttl 120s"))
        .stdout(predicate::str::contains("provider.api_key: missing"));
}

#[test]
fn test_check_reports_api_key_from_env() {
    let file = config_file("");

    kestrel()
        .env("KESTREL_API_KEY", "secret-value")
        .arg("--check")
        .arg("--config")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("provider.api_key: set"))
        .stdout(predicate::str::contains("secret-value").not());
}

#[test]
fn test_check_bind_override() {
    let file = config_file("");

    kestrel()
        .args(["--check", "--bind", "0.0.0.0:9400", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0.0.0:9400"));
}

#[test]
fn test_invalid_bind_rejected() {
    let file = config_file("");

    kestrel()
        .args(["--check", "--bind", "nowhere", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("server.bind"));
}

#[test]
fn test_health_ttl_must_be_shortest() {
    let file = config_file("[health]\nttl_secs = 90\n");

    kestrel()
        .arg("--check")
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("health.ttl_secs"));
}

#[test]
fn test_unknown_family_rejected() {
    let file = config_file("[cache.families.weather]\nttl_secs = 60\n");

    kestrel()
        .arg("--check")
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("weather"));
}

#[test]
fn test_missing_config_file() {
    kestrel()
        .args(["--check", "--config", "/nonexistent/kestrel.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}
