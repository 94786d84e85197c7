//! Per-run log file.
//!
//! The file is overwritten once per run, at exit or on panic, with a header
//! (start and end time, duration, command line, target URL) followed by
//! every captured log line.

use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::logging::LogBuffer;

const SEPARATOR: &str = "------------------------------------------------------------";

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    started_at: DateTime<Local>,
    started: Instant,
    command_line: String,
    url: String,
    buffer: LogBuffer,
    flushed: AtomicBool,
}

/// Handle to the current run log.
#[derive(Debug, Clone)]
pub struct RunLog {
    inner: Arc<Inner>,
}

impl RunLog {
    /// Start a run log. Nothing touches the disk until [`RunLog::flush`].
    pub fn start(
        path: impl Into<PathBuf>,
        command_line: impl Into<String>,
        url: impl Into<String>,
        buffer: LogBuffer,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                started_at: Local::now(),
                started: Instant::now(),
                command_line: command_line.into(),
                url: url.into(),
                buffer,
                flushed: AtomicBool::new(false),
            }),
        }
    }

    /// Log file path.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Whether the log has been written.
    pub fn is_flushed(&self) -> bool {
        self.inner.flushed.load(Ordering::SeqCst)
    }

    /// Render the full log contents.
    pub fn render(&self) -> String {
        let inner = &self.inner;
        let ended_at = Local::now();
        let elapsed = inner.started.elapsed();

        let mut out = String::new();
        out.push_str(&format!("Started:  {}\n", inner.started_at.to_rfc3339()));
        out.push_str(&format!("Ended:    {}\n", ended_at.to_rfc3339()));
        out.push_str(&format!("Duration: {:.3}s\n", elapsed.as_secs_f64()));
        out.push_str(&format!("Command:  {}\n", inner.command_line));
        out.push_str(&format!("Target:   {}\n", inner.url));
        out.push_str(SEPARATOR);
        out.push('\n');
        for line in inner.buffer.lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Write the log file. Only the first call writes.
    pub fn flush(&self) -> std::io::Result<()> {
        if self.inner.flushed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let contents = self.render();
        let mut file = std::fs::File::create(&self.inner.path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()
    }

    /// A guard that flushes the log when dropped.
    pub fn guard(&self) -> RunLogGuard {
        RunLogGuard { log: self.clone() }
    }

    /// Flush the log from the panic hook, then run the previous hook.
    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("panic: {}", info);
            let _ = log.flush();
            previous(info);
        }));
    }
}

/// Flushes the run log on drop.
#[derive(Debug)]
pub struct RunLogGuard {
    log: RunLog,
}

impl Drop for RunLogGuard {
    fn drop(&mut self) {
        if let Err(e) = self.log.flush() {
            eprintln!(
                "warning: could not write run log {}: {}",
                self.log.path().display(),
                e
            );
        }
    }
}
