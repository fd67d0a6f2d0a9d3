//! CLI integration tests for the `decisioning` binary.
//!
//! Tests run with the workspace root as current directory so fixture paths
//! resolve relative to it.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURE: &str = "fixtures/propositions_response.json";

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn decisioning() -> Command {
    let mut cmd = cargo_bin_cmd!("decisioning");
    cmd.current_dir(workspace_root());
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run decisioning");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn propositions(xdm: &Value) -> &Vec<Value> {
    xdm["_experience"]["decisioning"]["propositions"]
        .as_array()
        .expect("propositions array")
}

// ──────────────────────────────────────────────
// Help
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    decisioning()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect decisioning responses and interaction XDM",
        ));
}

// ──────────────────────────────────────────────
// parse
// ──────────────────────────────────────────────

#[test]
fn parse_lists_propositions_by_scope() {
    decisioning()
        .args(["parse", FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("myMbox"))
        .stdout(predicate::str::contains("defaultMbox"))
        .stdout(predicate::str::contains("(2 offers)"))
        .stdout(predicate::str::contains("[image/*]  https://example.com/img1.png"));
}

#[test]
fn parse_json_keys_by_scope() {
    let doc = stdout_json(decisioning().args(["--output", "json", "parse", FIXTURE]));
    let map = doc.as_object().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["myMbox"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(
        map["defaultMbox"]["items"][0]["schema"],
        "https://ns.adobe.com/personalization/default-content-item"
    );
}

#[test]
fn parse_accepts_bare_list() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("list.json");
    fs::write(
        &path,
        r#"[{"id": "p1", "scope": "s1", "items": [
            {"id": "a", "data": {"id": "a", "format": "text/plain", "content": "hello"}}
        ]}]"#,
    )
    .unwrap();

    decisioning()
        .arg("parse")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("s1  p1  (1 offers)"))
        .stdout(predicate::str::contains("a  [text/plain]  hello"));
}

#[test]
fn parse_missing_file_fails() {
    decisioning()
        .args(["parse", "fixtures/does-not-exist.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn parse_rejects_scalar_payload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("scalar.json");
    fs::write(&path, "42").unwrap();

    decisioning()
        .arg("parse")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("neither a response payload"));
}

// ──────────────────────────────────────────────
// display
// ──────────────────────────────────────────────

#[test]
fn display_all_offers_summarizes_propositions() {
    let xdm = stdout_json(decisioning().args(["--output", "json", "display", FIXTURE]));
    assert_eq!(xdm["eventType"], "decisioning.propositionDisplay");
    let entries = propositions(&xdm);
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.get("items").is_none()));
}

#[test]
fn display_selected_offers() {
    let xdm = stdout_json(decisioning().args([
        "display", FIXTURE, "--offer", "246315", "--offer", "1",
    ]));
    let ids: Vec<&str> = propositions(&xdm)
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        [
            "AT:eyJhY3Rpdml0eUlkIjoiMTExMTExIiwiZXhwZXJpZW5jZUlkIjoiMCJ9",
            "AT:eyJhY3Rpdml0eUlkIjoiMjIyMjIyIiwiZXhwZXJpZW5jZUlkIjoiMCJ9",
        ]
    );
}

#[test]
fn display_output_matches_schema() {
    let schema_src =
        fs::read_to_string(workspace_root().join("schema/interaction-xdm.schema.json")).unwrap();
    let schema: Value = serde_json::from_str(&schema_src).unwrap();
    let validator = jsonschema::validator_for(&schema).expect("schema compiles");

    let xdm = stdout_json(decisioning().args(["display", FIXTURE]));
    assert!(validator.is_valid(&xdm), "invalid xdm: {}", xdm);
}

#[test]
fn display_unknown_offer_fails() {
    decisioning()
        .args(["display", FIXTURE, "--offer", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no matching offers to track"));
}

#[test]
fn display_rejects_non_list_propositions() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("object.json");
    fs::write(&path, r#"{"propositions": {"id": "p1", "scope": "s1"}}"#).unwrap();

    decisioning()
        .arg("display")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid response"))
        .stderr(predicate::str::contains("expected array"))
        .stderr(predicate::str::contains("no matching offers").not());
}

// ──────────────────────────────────────────────
// tap
// ──────────────────────────────────────────────

#[test]
fn tap_scopes_items_to_offer() {
    let xdm = stdout_json(decisioning().args([
        "tap",
        FIXTURE,
        "--offer",
        "xcore:personalized-offer:2222222222222222",
    ]));
    assert_eq!(xdm["eventType"], "decisioning.propositionInteract");
    let entries = propositions(&xdm);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], "de03ac85-802a-4331-a905-a57053164d35");
    assert_eq!(
        entries[0]["items"],
        serde_json::json!([{"id": "xcore:personalized-offer:2222222222222222"}])
    );
    assert_eq!(
        entries[0]["scopeDetails"]["activity"]["id"],
        "xcore:offer-activity:1111111111111111"
    );
}

#[test]
fn tap_unknown_offer_json_error() {
    decisioning()
        .args(["--output", "json", "tap", FIXTURE, "--offer", "zzz"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(r#"{"error":"offer 'zzz' not found"}"#));
}

#[test]
fn tap_rejects_non_list_propositions() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("object.json");
    fs::write(&path, r#"{"propositions": "p1"}"#).unwrap();

    decisioning()
        .args(["tap", "--offer", "a"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid response"))
        .stderr(predicate::str::contains("not found").not());
}

#[test]
fn quiet_suppresses_error_text() {
    decisioning()
        .args(["--quiet", "tap", FIXTURE, "--offer", "zzz"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

#[test]
fn tap_requires_offer() {
    decisioning()
        .args(["tap", FIXTURE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--offer"));
}
