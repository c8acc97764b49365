//! Compiled defaults shared by the harness binaries.

use std::num::NonZeroU32;
use std::time::Duration;

/// Fixed name of the diagnostic log artefact consumed by CI.
pub const DEFAULT_LOG_FILE: &str = "wharf.log";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of full session attempts before giving up.
///
/// The sandboxed runtime is flaky while its assets warm up, so a single
/// attempt is rarely enough in CI.
pub const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Default hard deadline for one init-install-execute cycle.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default locator for the installable package artefact.
///
/// The packaging pipeline drops the framework wheel here before the harness
/// runs; the locator is opaque to the harness and forwarded verbatim to the
/// runtime shim.
pub const DEFAULT_PACKAGE_LOCATOR: &str = "dist";

/// Default runtime shim program resolved from `PATH`.
///
/// Environment descriptors provision this binary alongside the interpreter's
/// WASM assets; the harness never inspects it beyond launching it.
pub const DEFAULT_RUNTIME_PROGRAM: &str = "wharf-runtime";

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::LogFormat {
    crate::LogFormat::Compact
}
