//! Shared configuration for the wharf harness binaries.
//!
//! The crate owns the immutable knobs the harness is started with: the retry
//! policy bounding sandbox attempts, the launch specification for the
//! WebAssembly runtime shim, the artefact paths, and the telemetry format.
//! Values resolve in three layers: compiled defaults, `WHARF_*` environment
//! variables, then command-line flags applied by the caller.

pub mod defaults;
mod logging;
mod policy;

pub use logging::LogFormat;
pub use policy::{ConfigError, HarnessSettings, RetryPolicy, RuntimeSpec};
