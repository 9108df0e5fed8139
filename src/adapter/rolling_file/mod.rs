mod rotation;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub use rotation::{RollingWriter, RotationPolicy};

use crate::logger::Severity;
use crate::logger::config::{ConfigError, FileSinkConfig};
use crate::port::{LogSink, SinkError, SinkFilter};

const CHANNEL_CAPACITY: usize = 1024;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Rotating file sink. The hot path hands lines to a worker task over
/// a bounded channel; the worker appends, flushes on an interval, and
/// rotates per the file's policy. A full channel drops the line rather
/// than stalling the caller.
pub struct RollingFileSink {
    name: String,
    filter: SinkFilter,
    tx: mpsc::Sender<Bytes>,
    token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl RollingFileSink {
    pub async fn spawn(
        config: &FileSinkConfig,
        token: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let writer = RollingWriter::open(config.path.clone(), RotationPolicy::from(config))
            .await
            .map_err(|source| ConfigError::OpenFile {
                path: config.path.display().to_string(),
                source,
            })?;

        let name = format!(
            "file:{}",
            config
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| config.path.display().to_string())
        );
        let filter = if config.is_access_log {
            SinkFilter::access_only(config.levels.clone())
        } else {
            SinkFilter::app_only(config.levels.clone())
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let worker = tokio::spawn(write_loop(rx, writer, token.child_token(), name.clone()));

        Ok(Self {
            name,
            filter,
            tx,
            token,
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        })
    }

    /// Lines dropped because the worker fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for RollingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, severity: Severity, access: bool) -> bool {
        self.filter.accepts(severity, access)
    }

    fn write(&self, line: &Bytes) -> Result<(), SinkError> {
        self.tx.try_send(line.clone()).map_err(|e| match e {
            TrySendError::Full(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                SinkError::BufferFull {
                    name: self.name.clone(),
                }
            }
            TrySendError::Closed(_) => SinkError::Closed {
                name: self.name.clone(),
            },
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.token.cancel();
            let worker = self.worker.lock().take();
            if let Some(worker) = worker {
                if let Err(e) = worker.await {
                    error!(sink = %self.name, error = %e, "file sink worker task failed");
                }
            }
        })
    }
}

// =============================================================================
// Worker
// =============================================================================

async fn write_loop(
    mut rx: mpsc::Receiver<Bytes>,
    mut writer: RollingWriter,
    token: CancellationToken,
    name: String,
) {
    debug!(sink = %name, "file sink worker started");
    let mut flush_interval = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = flush_interval.tick() => {
                if let Err(e) = writer.flush().await {
                    error!(sink = %name, error = %e, "failed to flush log file");
                }
            }
            maybe_line = rx.recv() => match maybe_line {
                Some(line) => {
                    if let Err(e) = writer.write_line(&line).await {
                        error!(sink = %name, error = %e, "failed to write log line");
                    }
                }
                None => break,
            },
            () = token.cancelled() => {
                // Drain whatever is already queued before stopping.
                while let Ok(line) = rx.try_recv() {
                    if let Err(e) = writer.write_line(&line).await {
                        error!(sink = %name, error = %e, "failed to write log line");
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = writer.sync().await {
        error!(sink = %name, error = %e, "failed to sync log file on shutdown");
    }
    debug!(sink = %name, "file sink worker stopped");
}

// =============================================================================
// Tests
// =============================================================================
