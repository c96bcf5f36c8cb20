//! `analyze`, `rewrite` and `upload` through the binary against a mock API.

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn signed_in_home() -> TempDir {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("session.json"),
        json!({ "token": "tok-1" }).to_string(),
    )
    .unwrap();
    home
}

fn analysis_body() -> serde_json::Value {
    json!({
        "filename": "cv.txt",
        "length_cv_chars": 23,
        "ats": {
            "score_overall": 81,
            "skills": 90,
            "matched_keywords": ["rust", "tokio"],
            "missing_keywords": ["kafka"]
        },
        "ai": {"improved_bullets": ["Built async services in Rust"]},
        "cv_text": "Ada Lovelace, engineer"
    })
}

fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_analyze_text_prints_report() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/text"))
        .and(header("authorization", "Bearer tok-1"))
        .and(query_param("include_ai", "false"))
        .and(body_string_contains("Backend engineer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body()))
        .expect(1)
        .mount(&server)
        .await;

    let job = write_file(home.path(), "job.txt", "Backend engineer, Rust");

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", server.uri())
        .args([
            "analyze",
            "--job",
            &format!("@{job}"),
            "--text",
            "Ada Lovelace, engineer",
            "--no-ai",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("81%"))
        .stdout(predicate::str::contains("Skills"))
        .stdout(predicate::str::contains("kafka"))
        .stdout(predicate::str::contains("Built async services in Rust"));
}

#[tokio::test]
async fn test_analyze_file_then_rewrite_uses_extracted_text() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(query_param("include_ai", "true"))
        .and(body_string_contains("filename=\"cv.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rewrite"))
        .and(body_string_contains("Ada Lovelace, engineer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"rewritten_text": "Ada Lovelace, Rust engineer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cv = write_file(home.path(), "cv.txt", "Ada Lovelace, engineer");

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", server.uri())
        .args(["analyze", "--job", "Rust engineer", "--file", &cv, "--rewrite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("File: cv.txt"))
        .stdout(predicate::str::contains("Rewritten CV"))
        .stdout(predicate::str::contains("Ada Lovelace, Rust engineer"));
}

#[tokio::test]
async fn test_rewrite_on_free_plan_suggests_upgrade() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rewrite"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({"detail": "Pro plan required"})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", server.uri())
        .args(["rewrite", "--job", "Rust engineer", "--cv-text", "My CV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pro plan required"))
        .stderr(predicate::str::contains("Upgrade your plan"));

    // Payment errors leave the session alone.
    let session = std::fs::read_to_string(home.path().join("session.json")).unwrap();
    assert!(session.contains("tok-1"));
}

#[tokio::test]
async fn test_server_error_is_not_retried_for_analysis() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/text"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", server.uri())
        .args(["analyze", "--job", "Rust", "--text", "My CV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server error (HTTP 503)"));
}

#[tokio::test]
async fn test_upload_prints_receipt() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = signed_in_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resumes/upload"))
        .and(body_string_contains("filename=\"cv.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "cv.txt",
            "characters": 22,
            "preview": "Ada Lovelace, engineer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cv = write_file(home.path(), "cv.txt", "Ada Lovelace, engineer");

    cargo_bin_cmd!("cvopt")
        .env("CVOPT_HOME", home.path())
        .env("CVOPT_API_URL", server.uri())
        .args(["upload", &cv])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploaded cv.txt (22 characters extracted)"));
}
