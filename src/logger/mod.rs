//! Structured multi-sink logger.
//!
//! A [`Logger`] encodes each admitted event once as an NDJSON line and
//! fans it out to every sink that accepts the event's severity and
//! scope. Events pass a severity threshold and a duplicate sampler
//! before encoding. Child loggers created with [`Logger::with_fields`]
//! share sinks with their parent and stamp bound attributes onto every
//! event.

pub mod config;
mod context;
mod event;
mod mask;
mod sampler;

pub use config::{ConfigError, FileSinkConfig, LoggerConfig, RemoteSinkConfig};
pub use context::RequestContext;
pub use event::{Attr, LogEvent, ParseSeverityError, Scope, Severity};
pub use mask::{MASKED, Sensitive, mask_value};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::adapter::{RemoteSink, RollingFileSink, StdoutSink};
use crate::port::{LogSink, SinkError};
use sampler::Sampler;

const SAMPLE_WINDOW: Duration = Duration::from_secs(1);
const SAMPLE_FIRST: u64 = 100;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct LoggerInner {
    threshold: Severity,
    caller: bool,
    sinks: Vec<Arc<dyn LogSink>>,
    sampler: Sampler,
    token: CancellationToken,
    finished: AtomicBool,
}

/// Cheaply cloneable handle to a shared logging pipeline. Clones and
/// field-bound children all feed the same sinks; shutting any one of
/// them down shuts the pipeline down.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
    base_fields: Arc<Map<String, Value>>,
}

impl Logger {
    /// Builds a logger from configuration, spawning sink workers as
    /// needed. Fails when the configuration enables no sink or a sink
    /// cannot be brought up.
    pub async fn new(config: LoggerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let token = CancellationToken::new();
        match Self::build_sinks(&config, &token).await {
            Ok(sinks) => Ok(Self::assemble(config.threshold, config.caller, sinks, token)),
            Err(e) => {
                // Stop any worker spawned before the failing sink.
                token.cancel();
                Err(e)
            }
        }
    }

    /// Assembles a logger over caller-provided sinks. This is the seam
    /// for custom sink implementations and for tests.
    pub fn with_sinks(threshold: Severity, caller: bool, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self::assemble(threshold, caller, sinks, CancellationToken::new())
    }

    async fn build_sinks(
        config: &LoggerConfig,
        token: &CancellationToken,
    ) -> Result<Vec<Arc<dyn LogSink>>, ConfigError> {
        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();
        if config.enable_stdout {
            sinks.push(Arc::new(StdoutSink::new()));
        }
        if config.enable_file {
            for file_config in &config.file_sinks {
                let sink = RollingFileSink::spawn(file_config, token.child_token()).await?;
                sinks.push(Arc::new(sink));
            }
        }
        if config.enable_remote {
            if let Some(remote) = config.remote.clone() {
                sinks.push(Arc::new(RemoteSink::spawn(remote, token.child_token())?));
            }
        }
        Ok(sinks)
    }

    fn assemble(
        threshold: Severity,
        caller: bool,
        sinks: Vec<Arc<dyn LogSink>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                threshold,
                caller,
                sinks,
                sampler: Sampler::new(SAMPLE_WINDOW, SAMPLE_FIRST),
                token,
                finished: AtomicBool::new(false),
            }),
            base_fields: Arc::new(Map::new()),
        }
    }

    /// Generic entry point: logs `message` at `severity` with the
    /// given attributes, optionally tied to a correlation id.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: &str, attrs: Vec<Attr>, context_id: Option<&str>) {
        let caller = self.call_site();
        self.emit(severity, Scope::App, context_id, message, attrs, None, caller);
    }

    #[track_caller]
    pub fn debug(&self, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(Severity::Debug, Scope::App, None, message, attrs, None, caller);
    }

    #[track_caller]
    pub fn info(&self, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(Severity::Info, Scope::App, None, message, attrs, None, caller);
    }

    #[track_caller]
    pub fn warn(&self, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(Severity::Warn, Scope::App, None, message, attrs, None, caller);
    }

    #[track_caller]
    pub fn error(&self, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(Severity::Error, Scope::App, None, message, attrs, None, caller);
    }

    /// Records an access-log event at INFO severity.
    #[track_caller]
    pub fn access(&self, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(Severity::Info, Scope::Access, None, message, attrs, None, caller);
    }

    #[track_caller]
    pub fn debug_ctx(&self, ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(
            Severity::Debug,
            Scope::App,
            Some(ctx.context_id()),
            message,
            attrs,
            None,
            caller,
        );
    }

    #[track_caller]
    pub fn info_ctx(&self, ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(
            Severity::Info,
            Scope::App,
            Some(ctx.context_id()),
            message,
            attrs,
            None,
            caller,
        );
    }

    #[track_caller]
    pub fn warn_ctx(&self, ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(
            Severity::Warn,
            Scope::App,
            Some(ctx.context_id()),
            message,
            attrs,
            None,
            caller,
        );
    }

    #[track_caller]
    pub fn error_ctx(&self, ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(
            Severity::Error,
            Scope::App,
            Some(ctx.context_id()),
            message,
            attrs,
            None,
            caller,
        );
    }

    #[track_caller]
    pub fn access_ctx(&self, ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
        let caller = self.call_site();
        self.emit(
            Severity::Info,
            Scope::Access,
            Some(ctx.context_id()),
            message,
            attrs,
            None,
            caller,
        );
    }

    /// Logs at ERROR with an explicit stack trace, used by the panic
    /// recovery and error handling middleware.
    #[track_caller]
    pub fn error_with_stacktrace(
        &self,
        context_id: Option<&str>,
        message: &str,
        stacktrace: String,
        attrs: Vec<Attr>,
    ) {
        let caller = self.call_site();
        self.emit(
            Severity::Error,
            Scope::App,
            context_id,
            message,
            attrs,
            Some(stacktrace),
            caller,
        );
    }

    /// Returns a child logger that stamps the given attributes onto
    /// every event. Sensitive attributes are masked here, at attach
    /// time, not per event.
    pub fn with_fields(&self, attrs: Vec<Attr>) -> Self {
        let mut fields = (*self.base_fields).clone();
        for attr in attrs {
            fields.insert(attr.key, attr.value);
        }
        Self {
            inner: Arc::clone(&self.inner),
            base_fields: Arc::new(fields),
        }
    }

    /// Stops sink workers and flushes buffered events, waiting up to
    /// five seconds. Safe to call more than once; later calls are
    /// no-ops.
    pub async fn shutdown(&self) {
        if self.inner.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.token.cancel();
        let drains = self.inner.sinks.iter().map(|sink| sink.shutdown());
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, join_all(drains))
            .await
            .is_err()
        {
            tracing::warn!("logger shutdown timed out before all sinks drained");
        }
    }

    #[track_caller]
    fn call_site(&self) -> Option<String> {
        if self.inner.caller {
            let location = Location::caller();
            Some(format!("{}:{}", location.file(), location.line()))
        } else {
            None
        }
    }

    fn emit(
        &self,
        severity: Severity,
        scope: Scope,
        context_id: Option<&str>,
        message: &str,
        attrs: Vec<Attr>,
        stacktrace: Option<String>,
        caller: Option<String>,
    ) {
        if severity == Severity::Off || severity < self.inner.threshold {
            return;
        }
        if !self.inner.sampler.admit(severity, message) {
            return;
        }

        let mut fields = (*self.base_fields).clone();
        for attr in attrs {
            fields.insert(attr.key, attr.value);
        }

        let event = LogEvent {
            timestamp: chrono::Utc::now(),
            severity,
            scope,
            message: message.to_string(),
            context_id: context_id.map(str::to_string),
            caller,
            stacktrace,
            fields,
        };
        self.fan_out(&event);
    }

    fn fan_out(&self, event: &LogEvent) {
        let line = event.encode();
        let access = event.scope.is_access();
        let mut failures: Vec<(String, SinkError)> = Vec::new();
        for sink in &self.inner.sinks {
            if !sink.accepts(event.severity, access) {
                continue;
            }
            if let Err(error) = sink.write(&line) {
                failures.push((sink.name().to_string(), error));
            }
        }
        for (name, error) in failures {
            self.report_sink_failure(&name, &error);
        }
    }

    /// A failing sink must never fail the log call. The failure is
    /// reported to the remaining sinks directly, skipping the pipeline
    /// so a persistently broken sink cannot recurse.
    fn report_sink_failure(&self, failed: &str, error: &SinkError) {
        tracing::warn!(sink = failed, error = %error, "log sink write failed");

        let mut fields = Map::new();
        fields.insert("sink".to_string(), Value::String(failed.to_string()));
        let event = LogEvent {
            timestamp: chrono::Utc::now(),
            severity: Severity::Warn,
            scope: Scope::App,
            message: format!("log sink write failed: {error}"),
            context_id: None,
            caller: None,
            stacktrace: None,
            fields,
        };
        let line = event.encode();
        for sink in &self.inner.sinks {
            if sink.name() == failed || !sink.accepts(Severity::Warn, false) {
                continue;
            }
            let _ = sink.write(&line);
        }
    }
}

// =============================================================================
// Default logger
// =============================================================================

static DEFAULT_LOGGER: RwLock<Option<Logger>> = RwLock::new(None);

/// Installs the process-wide default logger used by the free logging
/// functions.
pub fn set_default(logger: Logger) {
    *DEFAULT_LOGGER.write() = Some(logger);
}

pub fn default_logger() -> Option<Logger> {
    DEFAULT_LOGGER.read().clone()
}

/// Shuts down and clears the default logger. A no-op when no default
/// is installed, so callers may invoke it unconditionally at exit.
pub async fn shutdown_default() {
    let logger = DEFAULT_LOGGER.write().take();
    if let Some(logger) = logger {
        logger.shutdown().await;
    }
}

#[track_caller]
pub fn debug(message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.debug(message, attrs);
    }
}

#[track_caller]
pub fn info(message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.info(message, attrs);
    }
}

#[track_caller]
pub fn warn(message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.warn(message, attrs);
    }
}

#[track_caller]
pub fn error(message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.error(message, attrs);
    }
}

#[track_caller]
pub fn access(message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.access(message, attrs);
    }
}

#[track_caller]
pub fn debug_ctx(ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.debug_ctx(ctx, message, attrs);
    }
}

#[track_caller]
pub fn info_ctx(ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.info_ctx(ctx, message, attrs);
    }
}

#[track_caller]
pub fn warn_ctx(ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.warn_ctx(ctx, message, attrs);
    }
}

#[track_caller]
pub fn error_ctx(ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.error_ctx(ctx, message, attrs);
    }
}

#[track_caller]
pub fn access_ctx(ctx: &RequestContext, message: &str, attrs: Vec<Attr>) {
    if let Some(logger) = DEFAULT_LOGGER.read().as_ref() {
        logger.access_ctx(ctx, message, attrs);
    }
}

// =============================================================================
// Tests
// =============================================================================
