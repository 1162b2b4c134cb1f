use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

const FAMILY: &str = r#"{
  "nodes": [
    {"id": "root", "label": "Family", "kind": "root", "level": 0},
    {"id": "personA", "label": "Alex", "kind": "person", "level": 1, "parent_ids": ["root"]},
    {"id": "personB", "label": "Bobbie", "kind": "person", "level": 1, "parent_ids": ["root"]},
    {"id": "catA1", "label": "Passports", "kind": "folder", "level": 2, "parent_ids": ["personA"]},
    {"id": "docA1a", "label": "Passport", "kind": "document", "level": 3, "parent_ids": ["catA1"]}
  ],
  "expanded": ["personA"]
}"#;

#[test]
fn cli_lays_out_a_dataset_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("family.json");
    fs::write(&input, FAMILY).expect("write dataset");

    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    let assert = Command::new(exe)
        .args(["layout", input.to_string_lossy().as_ref()])
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    let positions = value["positions"].as_object().expect("positions map");
    assert_eq!(positions.len(), 5);
    assert!(positions["docA1a"]["x"].is_f64());
    // The root is fixed at the configured center.
    assert_eq!(positions["root"]["x"], serde_json::json!(0.0));
    assert_eq!(positions["root"]["y"], serde_json::json!(0.0));
}

#[test]
fn cli_reads_the_dataset_from_stdin() {
    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    let assert = assert_cmd::Command::new(exe)
        .arg("layout")
        .write_stdin(FAMILY)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    assert_eq!(value["positions"].as_object().expect("positions map").len(), 5);
}

#[test]
fn cli_places_the_injected_root() {
    let dataset = r#"{
      "nodes": [
        {"id": "personA", "label": "Alex", "kind": "person"},
        {"id": "personB", "label": "Bobbie", "kind": "person"}
      ]
    }"#;
    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    let assert = assert_cmd::Command::new(exe)
        .arg("layout")
        .write_stdin(dataset)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    let positions = value["positions"].as_object().expect("positions map");
    assert_eq!(positions.len(), 3);
    assert!(positions.contains_key("virtual-root"), "injected root has a placement");
}

#[test]
fn cli_prints_the_visible_set() {
    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    let assert = assert_cmd::Command::new(exe)
        .args(["visible", "--expand", "catA1"])
        .write_stdin(FAMILY)
        .assert()
        .success();

    let keys: Vec<String> =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    assert!(keys.contains(&"catA1".to_string()));
    assert!(keys.contains(&"docA1a".to_string()), "expanded category shows its documents");
    assert!(keys.contains(&"personB".to_string()));
}

#[test]
fn cli_visible_only_filters_the_position_map() {
    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    let assert = assert_cmd::Command::new(exe)
        .args(["layout", "--visible-only"])
        .write_stdin(FAMILY)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json stdout");
    let positions = value["positions"].as_object().expect("positions map");
    assert_eq!(positions.len(), 4);
    assert!(positions.contains_key("catA1"));
    assert!(!positions.contains_key("docA1a"), "unexpanded category hides its documents");
}

#[test]
fn cli_writes_to_the_out_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("layout.json");

    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    assert_cmd::Command::new(exe)
        .args(["layout", "--pretty", "--out", out.to_string_lossy().as_ref()])
        .write_stdin(FAMILY)
        .assert()
        .success();

    let text = fs::read_to_string(&out).expect("read out file");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json out");
    assert!(value["positions"].is_object());
}

#[test]
fn cli_rejects_unknown_flags() {
    let exe = assert_cmd::cargo_bin!("heirloom-cli");
    Command::new(exe)
        .arg("--definitely-not-a-flag")
        .assert()
        .failure()
        .code(2);
}
