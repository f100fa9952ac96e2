//! Black-box tests for the command-line interface.

use assert_cmd::Command;
use predicates::prelude::*;

const PET_GRAPH: &str = r#"{
  "entities": [
    {
      "name": "Pet",
      "id": { "name": "id", "type": "int64" },
      "fields": [
        { "name": "name", "type": "string" }
      ]
    }
  ]
}"#;

const DANGLING_GRAPH: &str = r#"{
  "entities": [
    {
      "name": "Pet",
      "id": { "name": "id", "type": "int64" },
      "edges": [
        { "name": "owner", "target": "Nowhere" }
      ]
    }
  ]
}"#;

fn cmd() -> Command {
    Command::cargo_bin("oas-graph").unwrap()
}

#[test]
fn compile_writes_document_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, PET_GRAPH).unwrap();

    cmd()
        .arg("compile")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"openapi\":\"3.0.3\""))
        .stdout(predicate::str::contains("/pets"));
}

#[test]
fn compile_pretty_prints_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, PET_GRAPH).unwrap();

    cmd()
        .arg("compile")
        .arg(&graph)
        .arg("--pretty")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"openapi\": \"3.0.3\""));
}

#[test]
fn compile_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    let out = dir.path().join("openapi.json");
    std::fs::write(&graph, PET_GRAPH).unwrap();

    cmd()
        .arg("compile")
        .arg(&graph)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("/pets/{id}"));
}

#[test]
fn compile_honors_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    let config = dir.path().join("config.json");
    std::fs::write(&graph, PET_GRAPH).unwrap();
    std::fs::write(&config, r#"{ "title": "Pet Store", "version": "9.9.9" }"#).unwrap();

    cmd()
        .arg("compile")
        .arg(&graph)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pet Store"))
        .stdout(predicate::str::contains("9.9.9"));
}

#[test]
fn check_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, PET_GRAPH).unwrap();

    cmd()
        .arg("check")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok: 1 entities"));
}

#[test]
fn missing_file_exits_3() {
    cmd()
        .arg("compile")
        .arg("no-such-graph.json")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("no-such-graph.json"));
}

#[test]
fn malformed_json_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, "{ not json").unwrap();

    cmd().arg("compile").arg(&graph).assert().failure().code(2);
}

#[test]
fn schema_error_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("graph.json");
    std::fs::write(&graph, DANGLING_GRAPH).unwrap();

    cmd()
        .arg("compile")
        .arg(&graph)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Nowhere"));
}
