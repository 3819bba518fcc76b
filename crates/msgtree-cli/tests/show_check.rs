use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

const CLEAN: &str = r#"{"id":"q1","parent":{"id":"r1"},"sequence":1}
{"id":"r1","sequence":0}
{"id":"a1","parent":{"id":"q1","parent":{"id":"r1"}},"sequence":2,"versionIndex":0}
{"id":"a1-edit","parent":{"id":"q1","parent":{"id":"r1"}},"sequence":3,"versionIndex":1}
"#;

/// `lost` points at a deleted parent but still knows its grandparent.
const ORPHANED: &str = r#"[
  {"id":"r1","sequence":0},
  {"id":"q1","parent":{"id":"r1"},"sequence":1},
  {"id":"lost","parent":{"id":"gone","parent":{"id":"r1"}},"sequence":5}
]"#;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_show_prints_indented_tree() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.jsonl", CLEAN);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("r1 #0\n  q1 #1\n    a1 v0 #2\n    a1-edit v1 #3\n");
}

#[test]
fn test_show_json_lists_roots_and_node_map() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.jsonl", CLEAN);

    let output = cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["show", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["roots"], serde_json::json!(["r1"]));
    assert_eq!(value["map"]["r1"]["children"], serde_json::json!(["q1"]));
    assert_eq!(
        value["map"]["q1"]["children"],
        serde_json::json!(["a1", "a1-edit"])
    );
    assert_eq!(value["map"]["a1-edit"]["message"]["versionIndex"], 1);
}

#[test]
fn test_show_json_survives_deep_chain() {
    let dir = tempdir().unwrap();
    let mut contents = String::from("{\"id\":\"m0\",\"sequence\":0}\n");
    for i in 1..20_000 {
        contents.push_str(&format!(
            "{{\"id\":\"m{i}\",\"parent\":{{\"id\":\"m{}\"}},\"sequence\":{i}}}\n",
            i - 1
        ));
    }
    let file = write_file(dir.path(), "deep.jsonl", &contents);

    let output = cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["show", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["roots"], serde_json::json!(["m0"]));
    assert_eq!(value["map"]["m19998"]["children"], serde_json::json!(["m19999"]));
}

#[test]
fn test_log_flag_overrides_env_filter() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .env("MSGTREE_LOG", "off")
        .args(["--log", "debug", "show"])
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("repaired orphan"))
        .stderr(predicate::str::contains("lost"));
}

#[test]
fn test_log_env_silences_warnings() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .env("MSGTREE_LOG", "off")
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("r1 #0\n  q1 #1\n  lost #5\n")
        .stderr("");
}

#[test]
fn test_show_repairs_orphan_and_logs_to_stderr() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .env_remove("MSGTREE_LOG")
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("r1 #0\n  q1 #1\n  lost #5\n")
        .stderr(predicate::str::contains("repaired orphaned messages"));
}

#[test]
fn test_show_respects_repair_config() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[repair]\ngrandparent = false\n",
    )
    .unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout("r1 #0\n  q1 #1\n    lost #5\n");
}

#[test]
fn test_show_empty_file() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "empty.jsonl", "");

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("No messages found."));
}

#[test]
fn test_show_missing_file_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .arg("show")
        .arg(dir.path().join("nope.jsonl"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nope.jsonl"));
}

#[test]
fn test_show_reads_stdin() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["show", "-"])
        .write_stdin(CLEAN)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("r1 #0\n"));
}

#[test]
fn test_check_clean_input_passes() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.jsonl", CLEAN);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["check", "--strict"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("checked 4 messages, 1 roots"))
        .stdout(predicate::str::ends_with("ok\n"));
}

#[test]
fn test_check_reports_repairs() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("repaired lost -> grandparent r1"));
}

#[test]
fn test_check_strict_fails_on_repairs_with_exit_code_2() {
    let dir = tempdir().unwrap();
    let file = write_file(dir.path(), "messages.json", ORPHANED);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["check", "--strict"])
        .arg(&file)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("1 orphaned, 0 duplicate"));
}

#[test]
fn test_check_reports_duplicates() {
    let dir = tempdir().unwrap();
    let contents = format!("{CLEAN}{{\"id\":\"q1\",\"sequence\":9}}\n");
    let file = write_file(dir.path(), "messages.jsonl", &contents);

    cargo_bin_cmd!("msgtree")
        .env("MSGTREE_HOME", dir.path())
        .args(["check", "--strict"])
        .arg(&file)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("skipped duplicate q1"))
        .stdout(predicate::str::contains("checked 4 messages"));
}
