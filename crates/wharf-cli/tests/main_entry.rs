//! Integration tests for the `wharf` binary entry point.
//!
//! Each test materialises a small `sh` runtime shim speaking the control
//! protocol and drives the binary end to end, asserting on exit status,
//! stderr, and the log artefact left behind.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

const HAPPY_SHIM: &str = r#"echo '{"kind":"ready"}'
read request
echo '{"kind":"log","data":"resolving dependencies"}'
echo '{"kind":"installed"}'
read request
echo '{"kind":"completed"}'"#;

const INSTALL_FAIL_SHIM: &str = r#"echo '{"kind":"ready"}'
read request
echo '{"kind":"log","data":"fetching wheel"}'
echo '{"kind":"error","message":"wheel index unavailable"}'"#;

const STALLED_SHIM: &str = "sleep 30";

fn stub_shim(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("shim.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub shim");
    let mut permissions = fs::metadata(&path).expect("stat stub shim").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("mark stub shim executable");
    path
}

fn write_script(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("scenario.py");
    fs::write(&path, "import framework\nframework.check()\n").expect("write script");
    path
}

fn read_log(path: &Path) -> String {
    fs::read_to_string(path).expect("log artefact should exist")
}

#[test]
fn missing_script_exits_with_failure_and_usage() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("wharf.log");

    let mut command = cargo_bin_cmd!("wharf");
    command.arg("--log-file").arg(&log);
    command
        .assert()
        .failure()
        .stderr(contains("usage: wharf"))
        .stderr(contains("no script path was supplied"));

    assert!(!log.exists(), "missing input must leave no log artefact");
}

#[test]
fn successful_run_exits_zero_and_captures_output() {
    let dir = TempDir::new().expect("temp dir");
    let shim = stub_shim(&dir, HAPPY_SHIM);
    let script = write_script(&dir);
    let log = dir.path().join("wharf.log");

    let mut command = cargo_bin_cmd!("wharf");
    command
        .arg(&script)
        .arg("--runtime")
        .arg(&shim)
        .arg("--log-file")
        .arg(&log);
    command.assert().success();

    let contents = read_log(&log);
    assert!(
        contents.contains("resolving dependencies"),
        "log={contents}"
    );
}

#[test]
fn exhausted_attempts_exit_with_failure() {
    let dir = TempDir::new().expect("temp dir");
    let shim = stub_shim(&dir, INSTALL_FAIL_SHIM);
    let script = write_script(&dir);
    let log = dir.path().join("wharf.log");

    let mut command = cargo_bin_cmd!("wharf");
    command
        .arg(&script)
        .arg("--runtime")
        .arg(&shim)
        .arg("--log-file")
        .arg(&log)
        .arg("--max-attempts")
        .arg("2");
    command
        .assert()
        .failure()
        .stderr(contains("all 2 attempts failed"));

    let contents = read_log(&log);
    let failures = contents
        .lines()
        .filter(|line| line.starts_with("attempt"))
        .count();
    assert_eq!(failures, 2, "log={contents}");
}

#[test]
fn tolerated_exhaustion_exits_zero() {
    let dir = TempDir::new().expect("temp dir");
    let shim = stub_shim(&dir, INSTALL_FAIL_SHIM);
    let script = write_script(&dir);
    let log = dir.path().join("wharf.log");

    let mut command = cargo_bin_cmd!("wharf");
    command
        .arg(&script)
        .arg("--runtime")
        .arg(&shim)
        .arg("--log-file")
        .arg(&log)
        .arg("--max-attempts")
        .arg("2")
        .arg("--tolerate-failure");
    command.assert().success().stderr(contains("(tolerated)"));
}

#[test]
fn stalled_runtime_times_out() {
    let dir = TempDir::new().expect("temp dir");
    let shim = stub_shim(&dir, STALLED_SHIM);
    let script = write_script(&dir);
    let log = dir.path().join("wharf.log");

    let mut command = cargo_bin_cmd!("wharf");
    command
        .arg(&script)
        .arg("--runtime")
        .arg(&shim)
        .arg("--log-file")
        .arg(&log)
        .arg("--max-attempts")
        .arg("1")
        .arg("--attempt-timeout")
        .arg("1");
    command
        .assert()
        .failure()
        .stderr(contains("all 1 attempts failed"));

    let contents = read_log(&log);
    assert!(contents.contains("deadline"), "log={contents}");
}
