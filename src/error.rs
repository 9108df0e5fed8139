use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Environment;

/// Machine-readable error codes carried to clients. Codes outside this
/// set are legal; the wire mapping treats them as internal errors.
pub mod code {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const MISSING_FIELD: &str = "MISSING_FIELD";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    pub const DUPLICATE_REQUEST: &str = "DUPLICATE_REQUEST";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Maps a taxonomy code to its HTTP status. Unknown codes map to 500.
pub fn http_status_from_code(code: &str) -> StatusCode {
    match code {
        code::INVALID_REQUEST
        | code::MISSING_FIELD
        | code::INVALID_FORMAT
        | code::DUPLICATE_REQUEST => StatusCode::BAD_REQUEST,
        code::NOT_FOUND => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Domain error with a stable code, a client-safe message, an optional
/// root cause, and the stack captured where the error was constructed.
#[derive(Debug, Clone)]
pub struct ServiceError {
    code: &'static str,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
    stacktrace: String,
}

impl ServiceError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            stacktrace: capture_stacktrace(),
        }
    }

    pub fn with_source(
        code: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Arc::new(source)),
            stacktrace: capture_stacktrace(),
        }
    }

    pub fn invalid_request(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::with_source(code::INVALID_REQUEST, "Invalid request", source)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(code::MISSING_FIELD, format!("Missing mandatory field: {field}"))
    }

    pub fn invalid_format(field: &str) -> Self {
        Self::new(
            code::INVALID_FORMAT,
            format!("Invalid format for field: {field}"),
        )
    }

    pub fn duplicate_request(reason: &str) -> Self {
        Self::new(
            code::DUPLICATE_REQUEST,
            format!("Duplicate request: {reason}"),
        )
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(code::NOT_FOUND, format!("{entity} not found"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(code::INTERNAL_ERROR, message)
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stacktrace(&self) -> &str {
        &self.stacktrace
    }

    pub fn status(&self) -> StatusCode {
        http_status_from_code(self.code)
    }
}

fn capture_stacktrace() -> String {
    Backtrace::force_capture().to_string()
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {} - {}", self.code, self.message, source),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// Marker left on a response whose error body still needs rendering.
/// Its absence means a handler already wrote a body, and the error
/// handling middleware must not overwrite it.
#[derive(Debug, Clone, Copy)]
pub struct ErrorResponsePending;

/// Records an error on an already-written response so the error
/// handling middleware logs it without replacing the body.
pub fn record_error(response: &mut Response, error: ServiceError) {
    response.extensions_mut().insert(error);
}

impl IntoResponse for ServiceError {
    /// Produces a provisional response carrying the error in its
    /// extensions. The error handling middleware renders the body; the
    /// status here only covers the case where that middleware is not
    /// installed.
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = self.status();
        response.extensions_mut().insert(ErrorResponsePending);
        response.extensions_mut().insert(self);
        response
    }
}

/// Renders the client-facing error body. The stack trace is included
/// outside production only.
pub fn render_error_response(error: &ServiceError, environment: Environment) -> Response {
    let mut body = json!({
        "code": error.code(),
        "message": error.message(),
    });
    if !environment.is_production() {
        body["stack"] = Value::String(error.stacktrace().to_string());
    }
    (error.status(), Json(body)).into_response()
}

/// Top-level failures that abort startup or serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("logger error: {0}")]
    Logger(#[from] crate::logger::ConfigError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
    #[error("{0}")]
    Healthcheck(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_stable() {
        let table = [
            (code::INVALID_REQUEST, StatusCode::BAD_REQUEST),
            (code::MISSING_FIELD, StatusCode::BAD_REQUEST),
            (code::INVALID_FORMAT, StatusCode::BAD_REQUEST),
            (code::DUPLICATE_REQUEST, StatusCode::BAD_REQUEST),
            (code::NOT_FOUND, StatusCode::NOT_FOUND),
            (code::INTERNAL_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in table {
            assert_eq!(http_status_from_code(code), expected, "code {code}");
        }
    }

    #[test]
    fn test_unknown_code_maps_to_internal_server_error() {
        assert_eq!(
            http_status_from_code("EXAMPLE_CREATE_FAILED"),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(http_status_from_code(""), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_constructor_messages() {
        assert_eq!(
            ServiceError::missing_field("description").message(),
            "Missing mandatory field: description"
        );
        assert_eq!(
            ServiceError::invalid_format("example_id").message(),
            "Invalid format for field: example_id"
        );
        assert_eq!(
            ServiceError::duplicate_request("already exists").message(),
            "Duplicate request: already exists"
        );
        assert_eq!(ServiceError::not_found("example").message(), "example not found");
    }

    #[test]
    fn test_wrapped_source_is_reachable() {
        let root = std::io::Error::other("connection refused");
        let error = ServiceError::with_source(code::INTERNAL_ERROR, "query failed", root);

        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "connection refused");
        assert_eq!(error.code(), code::INTERNAL_ERROR);
        assert!(!error.stacktrace().is_empty());
    }

    #[test]
    fn test_display_includes_cause_when_present() {
        let root = std::io::Error::other("boom");
        let with_cause = ServiceError::with_source(code::INTERNAL_ERROR, "failed", root);
        assert_eq!(with_cause.to_string(), "INTERNAL_ERROR: failed - boom");

        let without = ServiceError::not_found("example");
        assert_eq!(without.to_string(), "NOT_FOUND: example not found");
    }

    #[test]
    fn test_into_response_carries_error_and_pending_marker() {
        let response = ServiceError::not_found("example").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorResponsePending>().is_some());
        let carried = response.extensions().get::<ServiceError>().unwrap();
        assert_eq!(carried.code(), code::NOT_FOUND);
    }

    #[test]
    fn test_record_error_leaves_body_ownership_with_handler() {
        let mut response = Response::new(Body::empty());
        record_error(&mut response, ServiceError::internal("late"));
        assert!(response.extensions().get::<ServiceError>().is_some());
        assert!(response.extensions().get::<ErrorResponsePending>().is_none());
    }
}
