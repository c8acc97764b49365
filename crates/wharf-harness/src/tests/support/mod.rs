//! Shared fixtures for harness tests.
//!
//! Session and retry tests drive real shim processes: small `sh` scripts
//! speaking the control protocol, materialised into a temporary directory.
//! Tests that touch the process-wide diagnostic writer serialise on
//! [`route_lock`] so parallel test threads cannot interleave activations.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use camino::Utf8PathBuf;
use tempfile::TempDir;
use wharf_config::RuntimeSpec;

use crate::sink::LogSink;

static ROUTE_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialises tests that swap the process-wide diagnostic writer.
pub fn route_lock() -> MutexGuard<'static, ()> {
    ROUTE_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Shim that boots, installs, and completes, with one native stderr line.
pub const HAPPY_SHIM: &str = r#"echo 'boot diagnostics' >&2
echo '{"kind":"ready"}'
read request
echo '{"kind":"log","data":"resolving dependencies"}'
echo '{"kind":"installed"}'
read request
echo '{"kind":"completed"}'"#;

/// Shim whose install phase fails after emitting one log line.
pub const INSTALL_FAIL_SHIM: &str = r#"echo '{"kind":"ready"}'
read request
echo '{"kind":"log","data":"fetching wheel"}'
echo '{"kind":"error","message":"wheel index unavailable"}'"#;

/// Shim whose execute phase raises inside the sandbox.
pub const EXEC_FAIL_SHIM: &str = r#"echo '{"kind":"ready"}'
read request
echo '{"kind":"installed"}'
read request
echo '{"kind":"error","message":"RuntimeError: boom"}'"#;

/// Shim that never acknowledges readiness.
pub const STALLED_SHIM: &str = "sleep 30";

/// Materialises an executable shim script inside `dir`.
pub fn stub_shim(dir: &TempDir, name: &str, body: &str) -> RuntimeSpec {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub shim");
    let mut permissions = fs::metadata(&path).expect("stat stub shim").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("mark stub shim executable");
    RuntimeSpec {
        program: Utf8PathBuf::from_path_buf(path).expect("utf-8 temp path"),
        args: Vec::new(),
    }
}

/// Opens a log sink inside `dir` and returns it with its path.
pub fn sink_in(dir: &TempDir) -> (Arc<LogSink>, Utf8PathBuf) {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("wharf.log")).expect("utf-8 temp path");
    let sink = Arc::new(LogSink::open(&path).expect("log sink should open"));
    (sink, path)
}

/// Reads the full log artefact back.
pub fn read_log(path: &Utf8PathBuf) -> String {
    fs::read_to_string(path).expect("log artefact should exist")
}

/// Shared state for interception behavioural tests.
///
/// Holds the route lock for the whole scenario so no other test can swap the
/// diagnostic writer mid-steps.
pub struct TestWorld {
    pub temp_dir: TempDir,
    pub sink: Arc<LogSink>,
    pub log_path: Utf8PathBuf,
    pub before: crate::intercept::DiagnosticWriter,
    _route: MutexGuard<'static, ()>,
}

impl TestWorld {
    pub fn new() -> Self {
        let route = route_lock();
        let temp_dir = TempDir::new().expect("failed to allocate temporary directory");
        let (sink, log_path) = sink_in(&temp_dir);
        Self {
            before: crate::intercept::current(),
            temp_dir,
            sink,
            log_path,
            _route: route,
        }
    }
}
