//! Process-wide diagnostic output interception.
//!
//! Package installation drags noisy progress output through a process-wide
//! diagnostic writer: nested resolver machinery outside the harness's direct
//! control calls [`emit`], and that output must not reach the primary console.
//! For the duration of the install phase the writer is swapped for one that
//! forwards to the run's [`LogSink`]; the swap is scoped by an RAII
//! [`InterceptGuard`], so the console route is restored exactly once on every
//! exit path, including failures. This mirrors the guard pattern used for
//! other process-global resources: capture, hold, restore on drop.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::sink::LogSink;

/// Shared diagnostic writer invoked once per diagnostic line.
pub type DiagnosticWriter = Arc<dyn Fn(&str) + Send + Sync>;

static ROUTE: Lazy<Mutex<DiagnosticWriter>> = Lazy::new(|| Mutex::new(console_writer()));

fn console_writer() -> DiagnosticWriter {
    Arc::new(|line: &str| {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    })
}

fn lock_route() -> MutexGuard<'static, DiagnosticWriter> {
    match ROUTE.lock() {
        Ok(route) => route,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Emits one diagnostic line through the currently installed writer.
pub fn emit(line: &str) {
    let writer = current();
    writer(line);
}

/// Returns the currently installed diagnostic writer.
pub fn current() -> DiagnosticWriter {
    Arc::clone(&lock_route())
}

fn swap(writer: DiagnosticWriter) -> DiagnosticWriter {
    std::mem::replace(&mut *lock_route(), writer)
}

/// Scoped redirection of the process-wide diagnostic writer.
///
/// Dropping the guard restores the writer that was installed at activation
/// time, exactly once, regardless of how the guarded phase exits. The writer
/// observed after the guard drops is reference-identical to the one observed
/// before activation.
pub struct InterceptGuard {
    previous: Option<DiagnosticWriter>,
}

impl InterceptGuard {
    /// Swaps the diagnostic writer for one forwarding lines to `sink`.
    #[must_use]
    pub fn activate(sink: Arc<LogSink>) -> Self {
        let forward: DiagnosticWriter = Arc::new(move |line: &str| sink.write_line(line));
        Self {
            previous: Some(swap(forward)),
        }
    }

    /// Restores the previous writer ahead of the guard's natural drop.
    pub fn restore(mut self) {
        self.restore_inner();
    }

    fn restore_inner(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = swap(previous);
        }
    }
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        self.restore_inner();
    }
}

impl std::fmt::Debug for InterceptGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptGuard")
            .field("active", &self.previous.is_some())
            .finish()
    }
}
