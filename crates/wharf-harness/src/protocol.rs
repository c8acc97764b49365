//! Line-delimited JSON control protocol spoken with the runtime shim.
//!
//! Requests flow harness-to-shim on the shim's stdin; events flow back on its
//! stdout, one JSON document per line. The shim's stderr is not part of the
//! protocol and is forwarded verbatim to the log sink.

use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Requests sent to the runtime shim.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RuntimeRequest<'a> {
    /// Install the package artefact and its transitive dependencies.
    Install {
        /// Opaque locator of the installable artefact.
        source: &'a str,
    },
    /// Evaluate the full script text inside the sandbox.
    Execute {
        /// Complete source text of the target script.
        source: &'a str,
    },
}

/// Events received from the runtime shim.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// The interpreter booted inside the isolation boundary.
    Ready,
    /// A diagnostic line produced while a phase is in flight.
    Log {
        /// The diagnostic line, without a trailing newline.
        data: String,
    },
    /// The package artefact finished installing.
    Installed,
    /// The script ran to completion without raising.
    Completed,
    /// A failure surfaced by the shim for the in-flight phase.
    Error {
        /// Human-readable failure cause.
        message: String,
    },
}

/// Writes one request as a JSON line and flushes it to the shim.
pub(crate) async fn write_jsonl<W>(writer: &mut W, request: &RuntimeRequest<'_>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(request).map_err(io::Error::from)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await
}
