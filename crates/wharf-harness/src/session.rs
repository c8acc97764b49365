//! Sandbox session lifecycle over the runtime shim process.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;
use wharf_config::RuntimeSpec;

use crate::error::HarnessError;
use crate::intercept::{self, InterceptGuard};
use crate::protocol::{self, RuntimeEvent, RuntimeRequest};
use crate::sink::LogSink;

/// Lifecycle states of a sandbox session.
///
/// No transition skips a state; a session that fails in any state moves
/// straight to [`SessionState::Terminated`] and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, shim not yet launched.
    Uninitialized,
    /// The interpreter booted and acknowledged readiness.
    Ready,
    /// The package under test is installed.
    Installed,
    /// The target script is being evaluated.
    Executing,
    /// The session is finished and must not be reused.
    Terminated,
}

/// One live instance of the WebAssembly-hosted interpreter.
///
/// A session is exclusively owned by one attempt and discarded afterwards,
/// whether the attempt succeeds or fails. Dropping the session kills the shim
/// process, which is how abandoned (timed-out) attempts are reaped; no
/// graceful drain is promised beyond the sink staying flushed.
pub struct SandboxSession {
    spec: RuntimeSpec,
    sink: Arc<LogSink>,
    state: SessionState,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    events: Option<Lines<BufReader<ChildStdout>>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl SandboxSession {
    /// Creates an uninitialised session bound to the given shim and sink.
    #[must_use]
    pub fn new(spec: RuntimeSpec, sink: Arc<LogSink>) -> Self {
        Self {
            spec,
            sink,
            state: SessionState::Uninitialized,
            child: None,
            stdin: None,
            events: None,
            stderr_task: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Boots the interpreter inside the isolation boundary.
    ///
    /// Spawns the runtime shim with its error stream wired into the log sink
    /// and waits for the `ready` control event. Suspends while the shim loads
    /// its WASM assets.
    pub async fn initialize(&mut self) -> Result<(), HarnessError> {
        self.ensure_state(SessionState::Uninitialized, |message| {
            HarnessError::Initialization { message }
        })?;
        self.spawn_shim()?;
        debug!(program = %self.spec.program, "runtime shim launched");

        let sink = Arc::clone(&self.sink);
        match self
            .await_terminal_event(|line| sink.write_line(line))
            .await
        {
            Ok(RuntimeEvent::Ready) => {
                self.state = SessionState::Ready;
                debug!("sandbox ready");
                Ok(())
            }
            Ok(RuntimeEvent::Error { message }) => self.fail(HarnessError::initialization(message)),
            Ok(other) => self.fail(HarnessError::initialization(format!(
                "unexpected control event during boot: {other:?}"
            ))),
            Err(message) => self.fail(HarnessError::initialization(message)),
        }
    }

    /// Installs the package under test and its dependencies into the sandbox.
    ///
    /// The process-wide diagnostic writer is intercepted for the duration of
    /// the phase and restored unconditionally, including when installation
    /// fails; the noisy resolver output therefore lands in the log sink and
    /// never reaches the primary console.
    pub async fn install_package(&mut self, locator: &str) -> Result<(), HarnessError> {
        self.ensure_state(SessionState::Ready, |message| HarnessError::Installation {
            message,
        })?;

        let guard = InterceptGuard::activate(Arc::clone(&self.sink));
        let outcome = self.install_intercepted(locator).await;
        guard.restore();
        outcome
    }

    async fn install_intercepted(&mut self, locator: &str) -> Result<(), HarnessError> {
        if let Err(message) = self.send(&RuntimeRequest::Install { source: locator }).await {
            return self.fail(HarnessError::installation(message));
        }
        match self.await_terminal_event(|line| intercept::emit(line)).await {
            Ok(RuntimeEvent::Installed) => {
                self.state = SessionState::Installed;
                debug!(%locator, "package installed into sandbox");
                Ok(())
            }
            Ok(RuntimeEvent::Error { message }) => self.fail(HarnessError::installation(message)),
            Ok(other) => self.fail(HarnessError::installation(format!(
                "unexpected control event during install: {other:?}"
            ))),
            Err(message) => self.fail(HarnessError::installation(message)),
        }
    }

    /// Executes the full script text as a unit inside the sandbox.
    ///
    /// Suspends until the sandboxed evaluation completes; an exception raised
    /// by the script surfaces as [`HarnessError::Execution`]. The session is
    /// terminated afterwards either way.
    pub async fn run(&mut self, source: &str) -> Result<(), HarnessError> {
        self.ensure_state(SessionState::Installed, |message| HarnessError::Execution {
            message,
        })?;
        self.state = SessionState::Executing;

        if let Err(message) = self.send(&RuntimeRequest::Execute { source }).await {
            return self.fail(HarnessError::execution(message));
        }
        let sink = Arc::clone(&self.sink);
        match self
            .await_terminal_event(|line| sink.write_line(line))
            .await
        {
            Ok(RuntimeEvent::Completed) => {
                self.state = SessionState::Terminated;
                self.reap().await;
                debug!("script completed inside sandbox");
                Ok(())
            }
            Ok(RuntimeEvent::Error { message }) => self.fail(HarnessError::execution(message)),
            Ok(other) => self.fail(HarnessError::execution(format!(
                "unexpected control event during execution: {other:?}"
            ))),
            Err(message) => self.fail(HarnessError::execution(message)),
        }
    }

    fn spawn_shim(&mut self) -> Result<(), HarnessError> {
        let mut command = Command::new(self.spec.program.as_str());
        command
            .args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| {
            HarnessError::initialization(format!(
                "failed to launch runtime shim '{}': {source}",
                self.spec.program
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::initialization("runtime shim stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::initialization("runtime shim stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HarnessError::initialization("runtime shim stderr unavailable"))?;

        // The shim's own diagnostics bypass the control protocol; forward
        // them to the sink in arrival order until the stream closes.
        let sink = Arc::clone(&self.sink);
        self.stderr_task = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                sink.write_line(&line);
            }
        }));

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.events = Some(BufReader::new(stdout).lines());
        Ok(())
    }

    async fn send(&mut self, request: &RuntimeRequest<'_>) -> Result<(), String> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| "control channel not connected".to_string())?;
        protocol::write_jsonl(stdin, request)
            .await
            .map_err(|error| format!("failed to send control request: {error}"))
    }

    /// Waits for the next non-log control event, forwarding log events to
    /// `on_log` as they arrive.
    async fn await_terminal_event<F>(&mut self, mut on_log: F) -> Result<RuntimeEvent, String>
    where
        F: FnMut(&str),
    {
        let events = self
            .events
            .as_mut()
            .ok_or_else(|| "control channel not connected".to_string())?;
        loop {
            let line = events
                .next_line()
                .await
                .map_err(|error| format!("control channel read failed: {error}"))?
                .ok_or_else(|| "runtime shim closed the control channel".to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let event: RuntimeEvent = serde_json::from_str(&line)
                .map_err(|error| format!("malformed control event '{line}': {error}"))?;
            match event {
                RuntimeEvent::Log { data } => on_log(&data),
                other => return Ok(other),
            }
        }
    }

    /// Waits for the shim to exit and the stderr forwarder to drain.
    ///
    /// Called only after the terminal `completed` event, so trailing shim
    /// diagnostics are in the sink before the caller observes success. A shim
    /// that lingers past `completed` is bounded by the attempt deadline, not
    /// here.
    async fn reap(&mut self) {
        // Closing the control channel lets a shim blocked on its next
        // request observe end of file and exit.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait().await;
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
    }

    fn ensure_state(
        &self,
        expected: SessionState,
        make: fn(String) -> HarnessError,
    ) -> Result<(), HarnessError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(make(format!(
                "session is {:?}, expected {expected:?}",
                self.state
            )))
        }
    }

    fn fail(&mut self, error: HarnessError) -> Result<(), HarnessError> {
        self.state = SessionState::Terminated;
        Err(error)
    }
}

impl Drop for SandboxSession {
    fn drop(&mut self) {
        // kill_on_drop reaps the shim; an early kill here keeps abandoned
        // (timed-out) sessions from lingering until the handle unwinds.
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
        // Detach the forwarder; it ends on its own once the shim's stderr
        // reaches end of file.
        drop(self.stderr_task.take());
    }
}

impl std::fmt::Debug for SandboxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxSession")
            .field("program", &self.spec.program)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
