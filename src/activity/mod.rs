//! Activity log: a human-readable trail of what the service did.
//!
//! [`LogSink::log`] emits each line to the console through `tracing` and
//! buffers it. A [`LogFlusher`] task appends the buffer to the log file on a
//! fixed interval. Appends and flushes share one lock, so a line is either
//! still buffered or already on disk, never both and never lost in between.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One buffered activity line.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogLine {
    fn now(message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            message,
        }
    }

    fn render(&self) -> String {
        format!(
            "{}\t{}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.message
        )
    }
}

/// Cheaply clonable handle to the shared activity buffer.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    buffer: Mutex<Vec<LogLine>>,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                buffer: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Record a line: console now, log file on the next flush.
    pub fn log(&self, message: impl Into<String>) {
        let line = LogLine::now(message.into());
        let mut buffer = self.inner.buffer.lock();
        tracing::info!(target: "pixelforge::activity", "{}", line.message);
        buffer.push(line);
    }

    /// Number of lines waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Append every buffered line to the log file and clear the buffer.
    ///
    /// Returns the number of lines written. On error the lines stay buffered
    /// and are retried by the next flush.
    pub fn flush(&self) -> std::io::Result<usize> {
        let mut buffer = self.inner.buffer.lock();
        if buffer.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let rendered: String = buffer.iter().map(LogLine::render).collect();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(rendered.as_bytes())?;

        let written = buffer.len();
        buffer.clear();
        Ok(written)
    }

    /// Start the periodic flush task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_flusher(&self, period: Duration) -> LogFlusher {
        self.log(format!("activity log started {}", Utc::now().to_rfc2822()));

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_flusher(self.clone(), period, token.clone()));
        LogFlusher { token, handle }
    }
}

/// Lifecycle handle for the flush task started by [`LogSink::start_flusher`].
pub struct LogFlusher {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LogFlusher {
    /// Stop the task after one final flush and wait for it to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Activity log flusher failed: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

async fn run_flusher(sink: LogSink, period: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => flush_off_runtime(&sink).await,
        }
    }

    flush_off_runtime(&sink).await;
    tracing::debug!("Activity log flusher stopped");
}

async fn flush_off_runtime(sink: &LogSink) {
    let sink = sink.clone();
    match tokio::task::spawn_blocking(move || sink.flush()).await {
        Ok(Ok(0)) => {}
        Ok(Ok(lines)) => tracing::debug!(lines, "Flushed activity log"),
        Ok(Err(e)) => tracing::warn!("Failed to flush activity log: {}", e),
        Err(e) => tracing::error!("Activity log flush task failed: {}", e),
    }
}
