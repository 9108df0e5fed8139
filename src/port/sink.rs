use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::logger::Severity;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink {name} buffer full, event dropped")]
    BufferFull { name: String },
    #[error("sink {name} is closed")]
    Closed { name: String },
    #[error("sink {name} write failed: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a sink treats access-log events relative to application events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFilter {
    /// Accept both application and access events.
    Any,
    /// Accept access events only.
    Only,
    /// Accept application events only.
    Exclude,
}

/// Per-sink admission rule, checked during fan-out. An empty level
/// list accepts every severity.
#[derive(Debug, Clone)]
pub struct SinkFilter {
    pub levels: Vec<Severity>,
    pub access: AccessFilter,
}

impl SinkFilter {
    pub fn any() -> Self {
        Self {
            levels: Vec::new(),
            access: AccessFilter::Any,
        }
    }

    pub fn app_only(levels: Vec<Severity>) -> Self {
        Self {
            levels,
            access: AccessFilter::Exclude,
        }
    }

    pub fn access_only(levels: Vec<Severity>) -> Self {
        Self {
            levels,
            access: AccessFilter::Only,
        }
    }

    pub fn accepts(&self, severity: Severity, access: bool) -> bool {
        match self.access {
            AccessFilter::Only if !access => return false,
            AccessFilter::Exclude if access => return false,
            _ => {}
        }
        self.levels.is_empty() || self.levels.contains(&severity)
    }
}

/// Outbound port for log destinations.
///
/// `write` runs on the logging hot path and must not block: sinks with
/// slow backing stores hand the line to a worker over a bounded
/// channel and report `BufferFull` when the worker is behind.
/// `shutdown` stops the worker and flushes whatever is buffered.
pub trait LogSink: Send + Sync {
    fn name(&self) -> &str;

    fn accepts(&self, severity: Severity, access: bool) -> bool;

    fn write(&self, line: &Bytes) -> Result<(), SinkError>;

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
