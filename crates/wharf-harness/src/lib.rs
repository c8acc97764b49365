//! Supervision layer for sandboxed framework test runs.
//!
//! The `wharf-harness` crate boots a WebAssembly-hosted interpreter through an
//! external runtime shim, installs the framework-under-test into it, executes
//! a target script, and retries the whole cycle under a bounded policy because
//! the sandboxed environment is slow and flaky to initialise. All diagnostic
//! output produced along the way lands in a single append-only [`LogSink`]
//! artefact for postmortem inspection.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use camino::Utf8PathBuf;
//! use wharf_config::{HarnessSettings, RetryPolicy};
//! use wharf_harness::{HarnessRequest, LogSink, retry};
//!
//! # async fn demo() -> Result<(), wharf_harness::HarnessError> {
//! let settings = HarnessSettings::default();
//! let sink = Arc::new(LogSink::open(&settings.log_file)?);
//! let request = HarnessRequest {
//!     runtime: settings.runtime,
//!     package: settings.package,
//!     script: Some(Utf8PathBuf::from("tests/smoke.py")),
//! };
//! let report = retry::run(&request, settings.policy, &sink).await?;
//! assert!(report.attempts >= 1);
//! # Ok(()) }
//! ```
//!
//! Attempts are strictly sequential; the runtime shim's initialisation is
//! resource-heavy and assumed non-reentrant, so no two sessions ever overlap.

mod error;
pub mod intercept;
mod protocol;
pub mod retry;
pub mod script;
mod session;
mod sink;

pub use error::HarnessError;
pub use protocol::{RuntimeEvent, RuntimeRequest};
pub use retry::{HarnessReport, HarnessRequest};
pub use session::{SandboxSession, SessionState};
pub use sink::LogSink;
