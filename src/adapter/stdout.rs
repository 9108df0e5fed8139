use std::future::Future;
use std::io::Write;
use std::pin::Pin;

use bytes::Bytes;

use crate::logger::Severity;
use crate::port::{LogSink, SinkError, SinkFilter};

/// Writes each encoded line straight to standard output. Lines are
/// written whole under the stdout lock so concurrent events never
/// interleave.
pub struct StdoutSink {
    filter: SinkFilter,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            filter: SinkFilter::any(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn accepts(&self, severity: Severity, access: bool) -> bool {
        self.filter.accepts(severity, access)
    }

    fn write(&self, line: &Bytes) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        out.write_all(line).map_err(|source| SinkError::Io {
            name: "stdout".to_string(),
            source,
        })
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {
            let _ = std::io::stdout().lock().flush();
        })
    }
}
