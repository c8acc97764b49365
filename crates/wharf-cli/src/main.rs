//! CLI entrypoint for the wharf sandbox harness.
//!
//! The binary delegates to [`wharf_cli::run`], which parses arguments,
//! resolves configuration, and supervises one sandboxed test run.

use std::io::{self, StderrLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    wharf_cli::run(std::env::args_os(), &mut stderr)
}
