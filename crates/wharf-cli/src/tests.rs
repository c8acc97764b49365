//! Unit tests for the CLI runtime with injected error streams.

use std::ffi::OsString;
use std::process::ExitCode;

use rstest::rstest;
use tempfile::TempDir;

use super::run;

fn args(items: &[&str]) -> Vec<OsString> {
    items.iter().map(OsString::from).collect()
}

// ExitCode offers no equality; compare the debug rendering instead.
fn assert_code(actual: ExitCode, expected: ExitCode) {
    assert_eq!(format!("{actual:?}"), format!("{expected:?}"));
}

#[test]
fn missing_script_prints_usage_and_fails() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("wharf.log");
    let log_arg = log.to_str().expect("utf-8 temp path");

    let mut stderr = Vec::new();
    let code = run(args(&["wharf", "--log-file", log_arg]), &mut stderr);

    assert_code(code, ExitCode::FAILURE);
    let rendered = String::from_utf8_lossy(&stderr);
    assert!(rendered.contains("usage: wharf"), "stderr={rendered}");
    assert!(
        rendered.contains("no script path was supplied"),
        "stderr={rendered}"
    );
    assert!(
        !log.exists(),
        "no sandbox work may happen without a script, so the artefact stays absent"
    );
}

#[rstest]
#[case::unknown_flag(&["wharf", "--bogus"])]
#[case::zero_attempts(&["wharf", "script.py", "--max-attempts", "0"])]
#[case::unknown_format(&["wharf", "script.py", "--log-format", "yaml"])]
fn invalid_arguments_are_usage_errors(#[case] argv: &[&str]) {
    let mut stderr = Vec::new();
    let code = run(args(argv), &mut stderr);

    assert_code(code, ExitCode::FAILURE);
    assert!(!stderr.is_empty(), "clap usage errors must reach stderr");
}

#[test]
fn unreadable_script_fails_before_any_attempt() {
    let dir = TempDir::new().expect("temp dir");
    let log = dir.path().join("wharf.log");
    let log_arg = log.to_str().expect("utf-8 temp path");
    let script = dir.path().join("missing-script.py");
    let script_arg = script.to_str().expect("utf-8 temp path");

    let mut stderr = Vec::new();
    let code = run(
        args(&[
            "wharf",
            script_arg,
            "--log-file",
            log_arg,
            "--runtime",
            "/definitely/missing/shim",
        ]),
        &mut stderr,
    );

    assert_code(code, ExitCode::FAILURE);
    let rendered = String::from_utf8_lossy(&stderr);
    assert!(
        rendered.contains("failed to read script"),
        "stderr={rendered}"
    );
}
