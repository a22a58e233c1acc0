//! Integration tests for the `hefty` binary.
//!
//! These exercise argument parsing and the fatal input paths that need no
//! network access.

use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hefty"))
}

#[test]
fn test_help_shows_options() {
    let output = cargo_bin().arg("--help").output().expect("failed to run hefty --help");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--registry", "--duplicate", "--exclude", "--ignore-entry", "--all", "--output"] {
        assert!(stdout.contains(flag), "help should show {flag}");
    }
}

#[test]
fn test_missing_lockfile_is_fatal() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "app", "version": "1.0.0"}"#,
    )
    .unwrap();

    let output = cargo_bin()
        .current_dir(dir.path())
        .output()
        .expect("failed to run hefty");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("yarn.lock"), "error should name yarn.lock: {stderr}");
    assert!(
        !dir.path().join("report.json").exists(),
        "no partial report on a fatal path"
    );
}

#[test]
fn test_conflicted_lockfile_is_fatal() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "app", "version": "1.0.0"}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("yarn.lock"),
        "<<<<<<< HEAD\nleftpad@^1.0.0:\n  version \"1.0.0\"\n>>>>>>> theirs\n",
    )
    .unwrap();

    let output = cargo_bin()
        .current_dir(dir.path())
        .output()
        .expect("failed to run hefty");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("merge conflict"), "error should mention the conflict: {stderr}");
}

#[test]
fn test_empty_project_writes_report() {
    // No dependencies at all: the analysis needs no network and the report
    // is a single entry tree.
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "app", "version": "1.0.0"}"#,
    )
    .unwrap();
    fs::write(dir.path().join("yarn.lock"), "# yarn lockfile v1\n").unwrap();

    let output = cargo_bin()
        .args(["--ignore-entry", "--json"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run hefty");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = fs::read_to_string(dir.path().join("report.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(json[0]["label"], "app");
    assert_eq!(json[0]["weight"], 0);

    // --json prints the same document to stdout
    let stdout = String::from_utf8_lossy(&output.stdout);
    let printed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(printed, json);
}
