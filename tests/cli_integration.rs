//! CLI integration tests for aidlgate.
//!
//! These tests drive the binary against small on-disk workspaces.

use std::fs;
use std::path::Path;
use std::process::Command;

use aidlgate::api::hash::{compute_link, HashChain};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const IFOO: &str = "package a;\ninterface IFoo {\n  void ping();\n}\n";

const MANIFEST: &str = r#"
[[interface]]
name = "foo"
srcs = ["a/IFoo.aidl"]
versions = ["1"]

[[module]]
name = "client"
kind = "java_library"
deps = ["foo-V2-java"]
"#;

/// Get the aidlgate binary command, isolated from the user's config.
fn aidlgate(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aidlgate").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("AIDLGATE_ROOT")
        .env_remove("AIDL_FROZEN_REL")
        .env_remove("RELEASE_AIDL_USE_UNFROZEN");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A workspace with one interface frozen at version 1 and a consumer of its tip.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "Aidl.toml", MANIFEST);
    write(root, "a/IFoo.aidl", IFOO);
    write(root, "aidl_api/foo/1/a/IFoo.aidl", IFOO);
    write(root, "aidl_api/foo/current/a/IFoo.aidl", IFOO);

    let dump = root.join("aidl_api/foo/1");
    let link = compute_link(&dump, "1", None).unwrap();
    HashChain::new(vec![link]).write(&dump).unwrap();
    tmp
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    aidlgate(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("freeze-api"))
        .stdout(predicate::str::contains("update-api"));
}

#[test]
fn test_check_succeeds() {
    let ws = workspace();
    aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("Checked 1 interfaces"));
}

#[test]
fn test_check_rejects_unfrozen_tip_in_release() {
    let ws = workspace();
    aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .arg("check")
        .env("AIDL_FROZEN_REL", "true")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unfrozen development version"))
        .stderr(predicate::str::contains("aborting due to 1 violation(s)"));
}

#[test]
fn test_check_without_declarations_fails() {
    let tmp = TempDir::new().unwrap();
    aidlgate(tmp.path())
        .arg("-C")
        .arg(tmp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Aidl.toml found"));
}

#[test]
fn test_plan_json() {
    let ws = workspace();
    let output = aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .args(["plan", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = plan["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"aidl-freeze-api"));
    assert!(names.contains(&"foo-api-dump"));
    assert!(names.contains(&"foo-check-hash-1"));
    assert!(plan["fingerprint"].is_string());
}

#[test]
fn test_metadata_json() {
    let ws = workspace();
    let output = aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .arg("metadata")
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries[0]["name"], "foo");
    assert_eq!(entries[0]["versions"], serde_json::json!(["1"]));
    assert_eq!(entries[0]["hashes"].as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["has_development"], false);
}

#[test]
fn test_metadata_to_file() {
    let ws = workspace();
    let out = ws.path().join("out/metadata.json");
    aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .arg("metadata")
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote metadata of 1 interfaces"));
    assert!(fs::read_to_string(out).unwrap().contains("\"foo\""));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    aidlgate(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aidlgate"));
}

#[test]
fn test_freeze_api_requires_target() {
    let ws = workspace();
    aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .arg("freeze-api")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required arguments were not provided"));
}

#[test]
fn test_update_api_unknown_interface() {
    let ws = workspace();
    aidlgate(ws.path())
        .arg("-C")
        .arg(ws.path())
        .args(["update-api", "bar"])
        .env("PATH", ws.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
