//! Domain errors raised while supervising a sandboxed run.

use std::io;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while driving a sandboxed test run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No script path was supplied; detected before any sandbox work begins.
    #[error("no script path was supplied")]
    MissingInput,

    /// The target script could not be read from disk.
    #[error("failed to read script '{path}': {source}")]
    Script {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// The log artefact could not be opened for appending.
    #[error("failed to open log file '{path}': {source}")]
    Sink {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// The isolation boundary could not be established.
    #[error("sandbox initialisation failed: {message}")]
    Initialization { message: String },

    /// Installing the package under test into the sandbox failed.
    #[error("package installation failed: {message}")]
    Installation { message: String },

    /// The script raised inside the sandbox.
    #[error("script execution failed: {message}")]
    Execution { message: String },

    /// One attempt overran its hard deadline and was abandoned.
    #[error("attempt exceeded the {limit:?} deadline")]
    AttemptTimeout { limit: Duration },

    /// Every attempt permitted by the retry policy failed.
    #[error("all {attempts} attempts failed; last failure: {last}")]
    AttemptsExhausted { attempts: u32, last: String },
}

impl HarnessError {
    /// Whether the retry loop may convert this failure into another attempt.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Initialization { .. }
                | Self::Installation { .. }
                | Self::Execution { .. }
                | Self::AttemptTimeout { .. }
        )
    }

    pub(crate) fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    pub(crate) fn installation(message: impl Into<String>) -> Self {
        Self::Installation {
            message: message.into(),
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}
