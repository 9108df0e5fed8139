//! In-memory sink for exercising the logging pipeline in tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use crate::logger::Severity;
use crate::port::{LogSink, SinkError, SinkFilter};

/// Captures encoded lines instead of writing them anywhere. Can be
/// switched into a failing mode to exercise sink failure handling.
pub struct MemorySink {
    name: String,
    filter: SinkFilter,
    lines: Mutex<Vec<String>>,
    should_fail: AtomicBool,
    write_count: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filter: SinkFilter::any(),
            lines: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn with_filter(name: &str, filter: SinkFilter) -> Self {
        Self {
            filter,
            ..Self::named(name)
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Raw captured lines, newline included.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Captured lines parsed back into JSON values.
    pub fn events(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Attempted writes, successful or not.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, severity: Severity, access: bool) -> bool {
        self.filter.accepts(severity, access)
    }

    fn write(&self, line: &Bytes) -> Result<(), SinkError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SinkError::Io {
                name: self.name.clone(),
                source: std::io::Error::other("simulated sink failure"),
            });
        }
        self.lines
            .lock()
            .push(String::from_utf8_lossy(line).into_owned());
        Ok(())
    }

    fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}
