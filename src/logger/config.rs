use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::event::Severity;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid logger configuration, must enable at least one of stdout, file, or remote")]
    NoSinkEnabled,
    #[error("file logging enabled but no file sinks configured")]
    NoFileSinks,
    #[error("file sink path must not be empty")]
    EmptyPath,
    #[error("file sink {field} must be positive")]
    InvalidBound { field: &'static str },
    #[error("remote logging enabled but no remote sink configured")]
    NoRemoteSink,
    #[error("invalid remote endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to open log file {path}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build remote sink client: {0}")]
    RemoteClient(String),
}

/// Logger configuration. At least one sink family must be enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Events below this severity are dropped before reaching any sink.
    pub threshold: Severity,
    /// Annotate events with the `file:line` of the log call site.
    pub caller: bool,
    pub enable_stdout: bool,
    pub enable_file: bool,
    pub enable_remote: bool,
    pub file_sinks: Vec<FileSinkConfig>,
    pub remote: Option<RemoteSinkConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            threshold: Severity::Info,
            caller: true,
            enable_stdout: true,
            enable_file: false,
            enable_remote: false,
            file_sinks: Vec::new(),
            remote: None,
        }
    }
}

impl LoggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enable_stdout && !self.enable_file && !self.enable_remote {
            return Err(ConfigError::NoSinkEnabled);
        }
        if self.enable_file {
            if self.file_sinks.is_empty() {
                return Err(ConfigError::NoFileSinks);
            }
            for sink in &self.file_sinks {
                sink.validate()?;
            }
        }
        if self.enable_remote {
            match &self.remote {
                None => return Err(ConfigError::NoRemoteSink),
                Some(remote) => remote.validate()?,
            }
        }
        Ok(())
    }
}

/// One rotating log file. `levels` empty means every severity is
/// accepted; `is_access_log` routes access events here and keeps
/// application events out (and vice versa).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub levels: Vec<Severity>,
    pub is_access_log: bool,
    /// Rotate before a write would push the file past this size.
    pub max_size_bytes: u64,
    /// Rotated backups older than this are deleted.
    pub max_age_hours: u32,
    /// Backups kept beyond this count are deleted, oldest first.
    /// Zero keeps every backup.
    pub max_backups: u32,
    /// Timestamp rotated backups in local time instead of UTC.
    pub local_time: bool,
    /// Gzip rotated backups.
    pub compress: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            levels: Vec::new(),
            is_access_log: false,
            max_size_bytes: 100 * 1024 * 1024,
            max_age_hours: 24 * 30,
            max_backups: 0,
            local_time: false,
            compress: false,
        }
    }
}

impl FileSinkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        if self.max_size_bytes == 0 {
            return Err(ConfigError::InvalidBound {
                field: "max_size_bytes",
            });
        }
        if self.max_age_hours == 0 {
            return Err(ConfigError::InvalidBound {
                field: "max_age_hours",
            });
        }
        Ok(())
    }
}

/// Remote NDJSON shipping endpoint. Lines accumulate in a buffer that
/// flushes when full or when the flush interval elapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSinkConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub buffer_size: usize,
    pub flush_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RemoteSinkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: None,
            password: None,
            buffer_size: 256 * 1024,
            flush_interval_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

impl RemoteSinkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme: {}", url.scheme()),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
