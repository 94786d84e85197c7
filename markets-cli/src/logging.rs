//! Tracing setup.
//!
//! Every event at DEBUG and above is captured in a [`LogBuffer`] that the
//! run log writes out when the process ends. With `--debug` the same events
//! are also printed to stderr, filtered by `MARKETS_LOG_LEVEL`.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Env var controlling the console log filter
pub const LOG_LEVEL_ENV: &str = "MARKETS_LOG_LEVEL";

/// Shared in-memory sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered output split into lines.
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.inner.lock();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Whether anything has been written.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Writer handed out by [`LogBuffer`] for each event.
#[derive(Debug)]
pub struct LogBufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn console_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("debug"))
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug: bool, buffer: LogBuffer) {
    let buffer_layer = fmt::layer()
        .with_writer(buffer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = debug.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(console_filter())
    });

    let _ = tracing_subscriber::registry()
        .with(buffer_layer)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_buffer_lines() {
        let buffer = LogBuffer::new();
        assert!(buffer.is_empty());

        let mut writer = buffer.make_writer();
        writer.write_all(b"first\nsecond\n").unwrap();

        assert_eq!(buffer.lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_buffer_captures_events() {
        let buffer = LogBuffer::new();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(buffer.clone())
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(collection = "markets", "created");
            tracing::trace!("dropped");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("created"));
        assert!(lines[0].contains("collection=\"markets\""));
    }
}
