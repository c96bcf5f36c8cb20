//! `cvopt config` and argument handling; no network needed.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_config_path_respects_cvopt_home() {
    let home = TempDir::new().unwrap();
    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            home.path().join("config.toml").to_string_lossy().to_string(),
        ));
}

#[test]
fn test_config_init_writes_template_once() {
    let home = TempDir::new().unwrap();
    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));

    let written = std::fs::read_to_string(home.path().join("config.toml")).unwrap();
    assert!(written.contains("request_timeout_secs"));

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_analyze_requires_exactly_one_cv_source() {
    let home = TempDir::new().unwrap();
    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .args(["analyze", "--job", "Rust", "--text", "cv", "--file", "cv.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_protected_command_without_session_is_denied() {
    let home = TempDir::new().unwrap();
    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", "http://127.0.0.1:9")
        .args(["analyze", "--job", "Rust", "--text", "My CV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in. Run `cvopt login` first."));
}

#[test]
fn test_status_without_session() {
    let home = TempDir::new().unwrap();
    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", "http://127.0.0.1:9")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));
}
