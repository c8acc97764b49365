//! Target script loading and execution.

use std::fs;

use camino::Utf8Path;

use crate::error::HarnessError;
use crate::session::SandboxSession;

/// Reads the full text of the target script.
///
/// A missing path is a configuration error, not a runtime one; it is detected
/// here, before any sandbox work begins, and consumes no attempts.
pub fn load(path: Option<&Utf8Path>) -> Result<String, HarnessError> {
    let path = path.ok_or(HarnessError::MissingInput)?;
    fs::read_to_string(path).map_err(|source| HarnessError::Script {
        path: path.to_owned(),
        source,
    })
}

/// Runs the loaded script inside an installed session.
///
/// Pure pass-through to [`SandboxSession::run`]; outcome policy lives with
/// the retry driver, not here.
pub async fn execute(session: &mut SandboxSession, source: &str) -> Result<(), HarnessError> {
    session.run(source).await
}
