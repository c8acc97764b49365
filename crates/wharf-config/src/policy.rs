//! Retry policy, runtime launch spec, and environment overrides.
//!
//! Settings resolve from compiled defaults first, then `WHARF_*` environment
//! variables. Command-line flags are layered on top by the CLI crate, which
//! mutates the resolved [`HarnessSettings`] directly.

use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::defaults;
use crate::logging::LogFormat;

const ENV_MAX_ATTEMPTS: &str = "WHARF_MAX_ATTEMPTS";
const ENV_ATTEMPT_TIMEOUT_SECS: &str = "WHARF_ATTEMPT_TIMEOUT_SECS";
const ENV_RUNTIME: &str = "WHARF_RUNTIME";
const ENV_PACKAGE: &str = "WHARF_PACKAGE";
const ENV_LOG_FILE: &str = "WHARF_LOG_FILE";
const ENV_LOG_FILTER: &str = "WHARF_LOG_FILTER";
const ENV_LOG_FORMAT: &str = "WHARF_LOG_FORMAT";

/// Bounds applied to the sandbox attempt loop.
///
/// The policy is supplied once at harness startup and never mutated while a
/// run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of full session lifecycles to attempt.
    pub max_attempts: NonZeroU32,
    /// Hard deadline for one init-install-execute cycle.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: defaults::DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Launch specification for the WebAssembly runtime shim.
///
/// The shim hosts the sandboxed interpreter and speaks the harness control
/// protocol on its standard streams. Its binary assets are provisioned by the
/// surrounding environment; the harness only needs to know how to start it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSpec {
    /// Program to launch, either absolute or resolved from `PATH`.
    pub program: Utf8PathBuf,
    /// Additional arguments passed verbatim to the program.
    pub args: Vec<String>,
}

impl Default for RuntimeSpec {
    fn default() -> Self {
        Self {
            program: Utf8PathBuf::from(defaults::DEFAULT_RUNTIME_PROGRAM),
            args: Vec::new(),
        }
    }
}

/// Fully resolved settings for one harness invocation.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    /// Retry bounds for the attempt loop.
    pub policy: RetryPolicy,
    /// How the runtime shim is launched.
    pub runtime: RuntimeSpec,
    /// Opaque locator of the installable package artefact.
    pub package: String,
    /// Path of the append-only diagnostic log artefact.
    pub log_file: Utf8PathBuf,
    /// Filter expression for harness telemetry.
    pub log_filter: String,
    /// Output format for harness telemetry.
    pub log_format: LogFormat,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            runtime: RuntimeSpec::default(),
            package: defaults::DEFAULT_PACKAGE_LOCATOR.to_string(),
            log_file: Utf8PathBuf::from(defaults::DEFAULT_LOG_FILE),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl HarnessSettings {
    /// Resolves settings from defaults and `WHARF_*` environment variables.
    pub fn resolve() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_value(ENV_MAX_ATTEMPTS)? {
            self.policy.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = env_value(ENV_ATTEMPT_TIMEOUT_SECS)? {
            let secs: u64 = parse_env(ENV_ATTEMPT_TIMEOUT_SECS, &value)?;
            self.policy.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = env_value(ENV_RUNTIME)? {
            self.runtime.program = Utf8PathBuf::from(value);
        }
        if let Some(value) = env_value(ENV_PACKAGE)? {
            self.package = value;
        }
        if let Some(value) = env_value(ENV_LOG_FILE)? {
            self.log_file = Utf8PathBuf::from(value);
        }
        if let Some(value) = env_value(ENV_LOG_FILTER)? {
            self.log_filter = value;
        }
        if let Some(value) = env_value(ENV_LOG_FORMAT)? {
            self.log_format = parse_env(ENV_LOG_FORMAT, &value)?;
        }
        Ok(())
    }
}

fn env_value(key: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode { key }),
    }
}

fn parse_env<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|error: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: error.to_string(),
    })
}

/// Errors raised while resolving harness settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override held a value that is not valid UTF-8.
    #[error("environment variable {key} is not valid UTF-8")]
    NonUnicode { key: &'static str },
    /// An environment override could not be parsed.
    #[error("environment variable {key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
