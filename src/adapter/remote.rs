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
use tracing::{debug, info, warn};

use crate::logger::Severity;
use crate::logger::config::{ConfigError, RemoteSinkConfig};
use crate::port::{LogSink, SinkError, SinkFilter};

const CHANNEL_CAPACITY: usize = 1024;
const SINK_NAME: &str = "remote";

/// Ships NDJSON batches to a remote collector. Lines accumulate in a
/// byte buffer that flushes when it reaches the configured size, when
/// the flush interval elapses, or at shutdown. A failed shipment is
/// logged and the batch dropped; delivery is best effort.
pub struct RemoteSink {
    filter: SinkFilter,
    tx: mpsc::Sender<Bytes>,
    token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl RemoteSink {
    pub fn spawn(config: RemoteSinkConfig, token: CancellationToken) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::RemoteClient(e.to_string()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let worker = tokio::spawn(ship_loop(rx, client, config, token.child_token()));

        Ok(Self {
            filter: SinkFilter::any(),
            tx,
            token,
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for RemoteSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn accepts(&self, severity: Severity, access: bool) -> bool {
        self.filter.accepts(severity, access)
    }

    fn write(&self, line: &Bytes) -> Result<(), SinkError> {
        self.tx.try_send(line.clone()).map_err(|e| match e {
            TrySendError::Full(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                SinkError::BufferFull {
                    name: SINK_NAME.to_string(),
                }
            }
            TrySendError::Closed(_) => SinkError::Closed {
                name: SINK_NAME.to_string(),
            },
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.token.cancel();
            let worker = self.worker.lock().take();
            if let Some(worker) = worker {
                if let Err(e) = worker.await {
                    warn!(sink = SINK_NAME, error = %e, "remote sink worker task failed");
                }
            }
        })
    }
}

// =============================================================================
// Worker
// =============================================================================

async fn ship_loop(
    mut rx: mpsc::Receiver<Bytes>,
    client: reqwest::Client,
    config: RemoteSinkConfig,
    token: CancellationToken,
) {
    info!(
        endpoint = %config.endpoint,
        buffer_size = config.buffer_size,
        flush_interval_secs = config.flush_interval_secs,
        "remote sink flush loop started"
    );
    let mut buffer: Vec<u8> = Vec::with_capacity(config.buffer_size);
    let mut flush_interval =
        tokio::time::interval(Duration::from_secs(config.flush_interval_secs));

    loop {
        tokio::select! {
            _ = flush_interval.tick() => {
                flush(&client, &config, &mut buffer).await;
            }
            maybe_line = rx.recv() => match maybe_line {
                Some(line) => {
                    buffer.extend_from_slice(&line);
                    if buffer.len() >= config.buffer_size {
                        flush(&client, &config, &mut buffer).await;
                    }
                }
                None => break,
            },
            () = token.cancelled() => {
                while let Ok(line) = rx.try_recv() {
                    buffer.extend_from_slice(&line);
                }
                break;
            }
        }
    }

    flush(&client, &config, &mut buffer).await;
    info!("remote sink flush loop stopped");
}

async fn flush(client: &reqwest::Client, config: &RemoteSinkConfig, buffer: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }
    let payload = std::mem::take(buffer);
    let sent = payload.len();

    let mut request = client
        .post(&config.endpoint)
        .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
        .body(payload);
    if let Some(username) = &config.username {
        request = request.basic_auth(username, config.password.as_deref());
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            debug!(bytes = sent, "shipped log batch");
        }
        Ok(response) => {
            warn!(status = %response.status(), bytes = sent, "remote sink flush rejected");
        }
        Err(e) => {
            warn!(error = %e, bytes = sent, "remote sink flush failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
