//! End-to-end tests for the `schema-manager` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID_SCHEMA: &str = r#"{
  "version": "1.0.0",
  "collections": {
    "categories": {
      "name": "categories",
      "type": "base",
      "schema": [
        { "name": "name", "type": "text", "required": true, "options": { "min": null, "max": 100, "pattern": "" } },
        { "name": "description", "type": "text", "options": {} }
      ],
      "listRule": "",
      "viewRule": "",
      "createRule": null,
      "updateRule": null,
      "deleteRule": null
    },
    "markets": {
      "name": "markets",
      "type": "base",
      "schema": [
        { "name": "name", "type": "text", "required": true, "options": {} },
        { "name": "category", "type": "relation", "options": { "collectionId": "CATEGORIES_ID", "maxSelect": 1 } }
      ]
    }
  }
}"#;

const DUPLICATE_FIELDS: &str = r#"{
  "version": "1.0.0",
  "collections": {
    "markets": {
      "name": "markets",
      "type": "base",
      "schema": [
        { "name": "name", "type": "text" },
        { "name": "name", "type": "text" }
      ]
    }
  }
}"#;

#[allow(deprecated)]
fn schema_manager(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("schema-manager").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("POCKETBASE_URL")
        .env_remove("DEBUG")
        .env_remove("PB_ADMIN_EMAIL")
        .env_remove("PB_ADMIN_PASSWORD")
        .env("HOME", dir.path());
    cmd
}

fn write_schema(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("schema.json");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn test_no_command_prints_usage() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_command() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir).arg("migrate").assert().failure();
}

#[test]
fn test_setup_is_offline() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir)
        .args(["--url", "http://127.0.0.1:1", "setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:1/_/"));
}

#[test]
fn test_non_boolean_debug_env_is_ignored() {
    for value in ["*", "1", "app:*"] {
        let dir = TempDir::new().unwrap();
        schema_manager(&dir)
            .env("DEBUG", value)
            .arg("setup")
            .assert()
            .success()
            .stdout(predicate::str::contains("Backend Setup"));
    }
}

#[test]
fn test_validate_valid_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, VALID_SCHEMA);

    schema_manager(&dir)
        .arg("validate")
        .arg("--schema")
        .arg(&schema)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 collections"));
}

#[test]
fn test_validate_invalid_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, DUPLICATE_FIELDS);

    schema_manager(&dir)
        .arg("validate")
        .arg("--schema")
        .arg(&schema)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_validate_malformed_json() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "{ \"version\": ");

    schema_manager(&dir)
        .arg("validate")
        .arg("--schema")
        .arg(&schema)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_compare_unreachable_backend() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, VALID_SCHEMA);

    schema_manager(&dir)
        .args(["--url", "http://127.0.0.1:1", "compare", "--schema"])
        .arg(&schema)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot connect"));
}

#[test]
fn test_run_log_written() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir).arg("setup").assert().success();

    let log = std::fs::read_to_string(dir.path().join("schema-manager.log")).unwrap();
    assert!(log.contains("Command:"));
    assert!(log.contains("setup"));
    assert!(log.contains("Target:   http://127.0.0.1:8090"));
}

#[test]
fn test_logout_without_cache() {
    let dir = TempDir::new().unwrap();
    schema_manager(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached credentials"));
}
