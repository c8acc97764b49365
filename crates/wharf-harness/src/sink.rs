//! Append-only diagnostic log sink backing the run artefact.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::HarnessError;

/// Append-only writer for the run's diagnostic log artefact.
///
/// Every byte captured during a run funnels through one sink instance, in the
/// real-time order writes occur. Writes are best-effort: a failing disk must
/// not take down run supervision, and writes must succeed from the caller's
/// perspective even while the output interceptor is mid-transition. Buffered
/// output is flushed on drop, so the artefact is complete on every exit path.
#[derive(Debug)]
pub struct LogSink {
    path: Utf8PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl LogSink {
    /// Opens the log file for appending, creating it when absent.
    ///
    /// The file is never truncated or seeked mid-run.
    pub fn open(path: &Utf8Path) -> Result<Self, HarnessError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| HarnessError::Sink {
                path: path.to_owned(),
                source,
            })?;
        Ok(Self {
            path: path.to_owned(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the log artefact.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends one line to the artefact, best-effort.
    pub fn write_line(&self, line: &str) {
        let mut writer = self.lock_writer();
        if let Err(error) = writeln!(writer, "{line}") {
            tracing::warn!(path = %self.path, %error, "failed to append to log sink");
        }
    }

    /// Flushes buffered output to disk.
    pub fn flush(&self) -> io::Result<()> {
        self.lock_writer().flush()
    }

    fn lock_writer(&self) -> MutexGuard<'_, BufWriter<File>> {
        // A poisoned lock only means another writer panicked mid-line; the
        // buffer itself is still usable and the artefact must keep filling.
        match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let writer = match self.writer.get_mut() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writer.flush();
    }
}
