use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::mask::{Sensitive, mask_value};

/// Log severity, ordered from least to most severe. `Off` sits above
/// `Error` so a logger with an `Off` threshold drops everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Off => "off",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSeverityError(String);

impl fmt::Display for ParseSeverityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown severity: {}", self.0)
    }
}

impl std::error::Error for ParseSeverityError {}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "off" => Ok(Severity::Off),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

/// Whether an event belongs to the application log or the access log.
/// Access events carry `"logger": "access"` on the wire and route to
/// access-only sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    App,
    Access,
}

impl Scope {
    pub fn is_access(self) -> bool {
        matches!(self, Scope::Access)
    }

    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            Scope::App => None,
            Scope::Access => Some("access"),
        }
    }
}

/// A single key/value attribute attached to a log event. The value is
/// captured as JSON at construction time, so masking decisions are made
/// where the data is still typed.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    /// Captures any serializable value. Values that fail to serialize
    /// are recorded as `null` rather than aborting the log call.
    pub fn new<T: Serialize>(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    /// Captures a value whose sensitive fields are replaced with the
    /// mask placeholder before the event ever reaches a sink.
    pub fn masked<T: Sensitive>(key: impl Into<String>, value: &T) -> Self {
        let raw = serde_json::to_value(value).unwrap_or(Value::Null);
        Self {
            key: key.into(),
            value: mask_value(&raw, false, T::sensitive_fields()),
        }
    }
}

/// A fully assembled log event, ready for encoding. One instance fans
/// out to every accepting sink as the same NDJSON line.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub scope: Scope,
    pub message: String,
    pub context_id: Option<String>,
    pub caller: Option<String>,
    pub stacktrace: Option<String>,
    pub fields: Map<String, Value>,
}

/// Wire layout. Field declaration order is the key order on the wire;
/// attributes flatten in after the fixed keys, preserving insertion
/// order.
#[derive(Serialize)]
struct WireEvent<'a> {
    timestamp: String,
    level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    logger: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    msg: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stacktrace: Option<&'a str>,
    #[serde(flatten)]
    fields: &'a Map<String, Value>,
}

impl LogEvent {
    /// Encodes the event as one newline-terminated JSON object.
    pub fn encode(&self) -> Bytes {
        let wire = WireEvent {
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            level: self.severity.as_str(),
            logger: self.scope.wire_name(),
            file: self.caller.as_deref(),
            msg: &self.message,
            context_id: self.context_id.as_deref(),
            stacktrace: self.stacktrace.as_deref(),
            fields: &self.fields,
        };
        let mut buf = serde_json::to_vec(&wire).unwrap_or_else(|_| b"{}".to_vec());
        buf.push(b'\n');
        Bytes::from(buf)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> LogEvent {
        LogEvent {
            timestamp: Utc::now(),
            severity: Severity::Info,
            scope: Scope::App,
            message: "hello".to_string(),
            context_id: None,
            caller: None,
            stacktrace: None,
            fields: Map::new(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Off);
    }

    #[test]
    fn test_severity_round_trip() {
        for level in ["debug", "info", "warn", "error", "off"] {
            let parsed: Severity = level.parse().unwrap();
            assert_eq!(parsed.as_str(), level);
        }
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warn);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_encode_minimal_event() {
        let line = sample_event().encode();
        assert_eq!(line.last(), Some(&b'\n'));

        let parsed: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["msg"], "hello");
        assert!(parsed.get("logger").is_none());
        assert!(parsed.get("context_id").is_none());
        assert!(parsed.get("stacktrace").is_none());
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_encode_full_event() {
        let mut event = sample_event();
        event.severity = Severity::Error;
        event.scope = Scope::Access;
        event.context_id = Some("abc123".to_string());
        event.caller = Some("src/app/mod.rs:42".to_string());
        event.stacktrace = Some("0: main".to_string());
        event.fields.insert("status".to_string(), Value::from(200));

        let parsed: Value = serde_json::from_slice(&event.encode()).unwrap();
        assert_eq!(parsed["level"], "error");
        assert_eq!(parsed["logger"], "access");
        assert_eq!(parsed["file"], "src/app/mod.rs:42");
        assert_eq!(parsed["context_id"], "abc123");
        assert_eq!(parsed["stacktrace"], "0: main");
        assert_eq!(parsed["status"], 200);
    }

    #[test]
    fn test_encode_preserves_attribute_order() {
        let mut event = sample_event();
        for key in ["zulu", "alpha", "mike"] {
            event.fields.insert(key.to_string(), Value::from(1));
        }

        let line = event.encode();
        let text = std::str::from_utf8(&line).unwrap();
        let zulu = text.find("\"zulu\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let mike = text.find("\"mike\"").unwrap();
        assert!(zulu < alpha && alpha < mike);
    }

    #[test]
    fn test_attr_captures_serialization_failure_as_null() {
        // f64::NAN has no JSON representation.
        let attr = Attr::new("bad", f64::NAN);
        assert_eq!(attr.value, Value::Null);
    }
}
