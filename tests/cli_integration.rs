//! Integration tests for the catalogctl binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const VALID: &str = r#"{
    "databases": [{
        "name": "dbName1",
        "identifier": "dbId1",
        "collections": [{
            "name": "colName1",
            "identifier": "colId1",
            "doc_parts": [{
                "table_ref": "$root",
                "identifier": "docPartId1",
                "fields": [{"name": "fieldName1", "identifier": "fieldId1", "type": "INTEGER"}],
                "indexes": [{"identifier": "idxId1", "columns": [{"identifier": "fieldId1", "ordering": "ASC"}]}]
            }],
            "indexes": [{"name": "idxName1", "fields": [{"table_ref": "$root", "name": "fieldName1", "ordering": "ASC"}]}]
        }]
    }]
}"#;

/// The logical index has no doc part index backing it.
const UNBACKED: &str = r#"{
    "databases": [{
        "name": "dbName1",
        "identifier": "dbId1",
        "collections": [{
            "name": "colName1",
            "identifier": "colId1",
            "doc_parts": [{
                "table_ref": "$root",
                "identifier": "docPartId1",
                "fields": [{"name": "fieldName1", "identifier": "fieldId1", "type": "INTEGER"}]
            }],
            "indexes": [{"name": "idxName1", "fields": [{"table_ref": "$root", "name": "fieldName1", "ordering": "ASC"}]}]
        }]
    }]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// The binary, isolated from any config of the user running the tests.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("catalogctl").unwrap();
        cmd.env_remove("DOCPART_CATALOG_CONFIG")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.dir.path())
            .env("HOME", self.dir.path());
        cmd
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn show_prints_tree() {
    let fx = Fixture::new();
    let dump = fx.write("catalog.json", VALID);

    fx.cmd()
        .args(["show", arg(&dump)])
        .assert()
        .success()
        .stdout(predicate::str::contains("database dbName1 (dbId1)"))
        .stdout(predicate::str::contains("doc part $root (docPartId1)"))
        .stdout(predicate::str::contains("index idxName1 [$root/fieldName1 ASC]"));
}

#[test]
fn show_json_is_canonical() {
    let fx = Fixture::new();
    let dump = fx.write("catalog.json", VALID);

    let output = fx.cmd().args(["show", "--json", arg(&dump)]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["databases"][0]["identifier"], "dbId1");
}

#[test]
fn verify_accepts_valid_dump() {
    let fx = Fixture::new();
    let dump = fx.write("catalog.json", VALID);

    fx.cmd()
        .args(["verify", arg(&dump)])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok:"));
}

#[test]
fn verify_reports_unbacked_index() {
    let fx = Fixture::new();
    let dump = fx.write("catalog.json", UNBACKED);

    fx.cmd()
        .args(["verify", arg(&dump)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("violation: index 'idxName1'"))
        .stderr(predicate::str::contains("1 invariant violation(s)"));
}

#[test]
fn fingerprint_ignores_formatting() {
    let fx = Fixture::new();
    let pretty = fx.write("pretty.json", VALID);
    let compact: serde_json::Value = serde_json::from_str(VALID).unwrap();
    let compact = fx.write("compact.json", &compact.to_string());

    let first = fx.cmd().args(["fingerprint", arg(&pretty)]).output().unwrap();
    let second = fx.cmd().args(["fingerprint", arg(&compact)]).output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(String::from_utf8_lossy(&first.stdout).trim().len(), 64);
}

#[test]
fn malformed_dump_fails_with_context() {
    let fx = Fixture::new();
    let dump = fx.write("broken.json", "{\"databases\": [");

    fx.cmd()
        .args(["show", arg(&dump)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse snapshot dump"));
}

#[test]
fn missing_dump_fails() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["fingerprint", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot dump"));
}

#[test]
fn config_defaults_without_file() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("ledger_capacity = 256"));
}

#[test]
fn config_flag_loads_file() {
    let fx = Fixture::new();
    let config = fx.write("catalog.toml", "[merge]\nverify_after_merge = true\n");

    fx.cmd()
        .args(["config", "--config", arg(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("verify_after_merge = true"));
}

#[test]
fn invalid_config_is_rejected() {
    let fx = Fixture::new();
    let config = fx.write("catalog.toml", "[merge]\nledger_capacity = 0\n");

    fx.cmd()
        .args(["--config", arg(&config), "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
