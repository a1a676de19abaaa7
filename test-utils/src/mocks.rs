//! Capturing sinks for logs and statsd metrics.

use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cadence::MetricSink;
use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Captures JSON log output in memory.
///
/// ```
/// use test_utils::LogCapture;
///
/// let capture = LogCapture::new();
/// tracing::subscriber::with_default(capture.subscriber(), || {
///     tracing::info!(user = "u-1", "hello");
/// });
/// let lines = capture.lines();
/// assert_eq!(lines[0]["message"], "hello");
/// assert_eq!(lines[0]["user"], "u-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

/// Writer handed out by [`LogCapture`].
#[derive(Debug)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: self.buffer.clone(),
        }
    }
}

impl LogCapture {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A JSON subscriber at `TRACE` that writes into this capture.
    ///
    /// Install it with `tracing::subscriber::set_default` or `with_default`.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_max_level(LevelFilter::TRACE)
            .with_writer(self.clone())
            .finish()
    }

    /// Every captured line parsed as JSON; unparseable lines are skipped.
    #[must_use]
    pub fn lines(&self) -> Vec<serde_json::Value> {
        let buffer = self.buffer.lock();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Captured lines whose `message` equals `message`.
    #[must_use]
    pub fn events(&self, message: &str) -> Vec<serde_json::Value> {
        self.lines()
            .into_iter()
            .filter(|line| line["message"] == message)
            .collect()
    }
}

/// Statsd sink that records every emitted metric line.
///
/// `cadence` requires sinks to be `RefUnwindSafe`, which a `parking_lot`
/// mutex is not, so the lock is wrapped in `AssertUnwindSafe`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<AssertUnwindSafe<Mutex<Vec<String>>>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metric lines emitted so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Forget recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl MetricSink for RecordingSink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        self.lines.lock().push(metric.to_string());
        Ok(metric.len())
    }
}
