//! Bounded retry supervision over the sandbox session lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::time;
use tracing::{debug, info, warn};
use wharf_config::{RetryPolicy, RuntimeSpec};

use crate::error::HarnessError;
use crate::script;
use crate::session::SandboxSession;
use crate::sink::LogSink;

/// What one harness invocation is asked to do.
#[derive(Debug, Clone)]
pub struct HarnessRequest {
    /// Launch spec for the runtime shim.
    pub runtime: RuntimeSpec,
    /// Opaque locator of the installable package artefact.
    pub package: String,
    /// Path of the target script, when one was supplied.
    pub script: Option<Utf8PathBuf>,
}

/// Summary of a successful harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessReport {
    /// Number of session lifecycles consumed, including the successful one.
    pub attempts: u32,
}

/// Races `future` against a hard deadline.
///
/// On expiry the in-flight future is dropped, not drained: the sandbox is
/// process-isolated and discarded wholesale, so abandonment is safe.
pub async fn with_deadline<F>(limit: Duration, future: F) -> Result<F::Output, HarnessError>
where
    F: Future,
{
    time::timeout(limit, future)
        .await
        .map_err(|_| HarnessError::AttemptTimeout { limit })
}

/// Drives `attempt` under the retry policy, strictly sequentially.
///
/// Each retryable failure is appended to the sink and converted into the next
/// attempt; non-retryable failures propagate immediately. Exhaustion surfaces
/// as [`HarnessError::AttemptsExhausted`] so the caller, not this component,
/// decides whether to tolerate it.
pub async fn drive<F, Fut>(
    policy: RetryPolicy,
    sink: &LogSink,
    mut attempt: F,
) -> Result<HarnessReport, HarnessError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(), HarnessError>>,
{
    let max = policy.max_attempts.get();
    let mut last: Option<HarnessError> = None;

    for number in 1..=max {
        let outcome = with_deadline(policy.attempt_timeout, attempt(number))
            .await
            .and_then(|inner| inner);
        match outcome {
            Ok(()) => {
                info!(attempt = number, "sandbox run succeeded");
                return Ok(HarnessReport { attempts: number });
            }
            Err(error) if error.is_retryable() => {
                warn!(attempt = number, %error, "sandbox attempt failed");
                sink.write_line(&format!("attempt {number} failed: {error}"));
                last = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    let last = last.map_or_else(|| "no failure recorded".to_string(), |e| e.to_string());
    Err(HarnessError::AttemptsExhausted {
        attempts: max,
        last,
    })
}

/// Runs the full harness: load the script, then retry fresh sessions through
/// the init, install, and execute phases until success or exhaustion.
///
/// Sessions are never reused across attempts; a failed or timed-out session
/// is dropped, which kills its shim process.
pub async fn run(
    request: &HarnessRequest,
    policy: RetryPolicy,
    sink: &Arc<LogSink>,
) -> Result<HarnessReport, HarnessError> {
    let source = script::load(request.script.as_deref())?;

    drive(policy, sink, |number| {
        let source = source.clone();
        let runtime = request.runtime.clone();
        let package = request.package.clone();
        let sink = Arc::clone(sink);
        async move {
            debug!(attempt = number, "starting sandbox attempt");
            let mut session = SandboxSession::new(runtime, sink);
            session.initialize().await?;
            session.install_package(&package).await?;
            script::execute(&mut session, &source).await
        }
    })
    .await
}
