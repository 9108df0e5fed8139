use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum_test::TestServer;
use serde_json::{Value, json};
use spor::adapter::MemoryRepository;
use spor::app::AppState;
use spor::app::router::{apply_middleware, build_router};
use spor::config::Environment;
use spor::error::{ServiceError, record_error};
use spor::logger::{Logger, Severity};
use spor::port::LogSink;
use spor::test_support::MemorySink;

fn test_state(environment: Environment) -> (AppState, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let sinks: Vec<Arc<dyn LogSink>> = vec![sink.clone()];
    let repository = MemoryRepository::new();
    repository.preload(&["Example 1", "Example 2"]);
    let state = AppState {
        logger: Logger::with_sinks(Severity::Debug, true, sinks),
        repository: Arc::new(repository),
        environment,
    };
    (state, sink)
}

fn test_server(environment: Environment) -> (TestServer, Arc<MemorySink>) {
    let (state, sink) = test_state(environment);
    (TestServer::new(build_router(state)).unwrap(), sink)
}

fn error_events(sink: &MemorySink) -> Vec<Value> {
    sink.events()
        .into_iter()
        .filter(|event| event["level"] == "error")
        .collect()
}

#[tokio::test]
async fn test_health_returns_healthy() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.get("/v1/health").await;
    response.assert_status_ok();
    response.assert_text("Healthy");
}

#[tokio::test]
async fn test_get_example_returns_preloaded_row() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.get("/api/v1/example/1").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["id"], 1);
    assert_eq!(body["description"], "Example 1");
}

#[tokio::test]
async fn test_get_example_rejects_malformed_id() {
    let (server, _sink) = test_server(Environment::Development);
    for bad_id in ["abc", "0", "-3", "1.5"] {
        let response = server.get(&format!("/api/v1/example/{bad_id}")).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_FORMAT", "id {bad_id:?}");
        assert_eq!(body["message"], "Invalid format for field: example_id");
    }
}

#[tokio::test]
async fn test_get_missing_example_is_not_found() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.get("/api/v1/example/99").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "example not found");
}

#[tokio::test]
async fn test_create_example_returns_created() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server
        .post("/api/v1/example")
        .json(&json!({"description": "A new example"}))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["id"], 3);
    assert_eq!(body["description"], "A new example");
}

#[tokio::test]
async fn test_create_example_rejects_malformed_json() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.post("/api/v1/example").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(body["message"], "Invalid request");
}

#[tokio::test]
async fn test_create_example_requires_description() {
    let (server, _sink) = test_server(Environment::Development);
    for body in [json!({}), json!({"description": ""})] {
        let response = server.post("/api/v1/example").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_FIELD");
        assert_eq!(body["message"], "Missing mandatory field: description");
    }
}

#[tokio::test]
async fn test_create_example_rejects_overlong_description() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server
        .post("/api/v1/example")
        .json(&json!({"description": "x".repeat(101)}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_FORMAT");
    assert_eq!(body["message"], "Invalid format for field: description");
}

#[tokio::test]
async fn test_create_duplicate_example_rejected() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server
        .post("/api/v1/example")
        .json(&json!({"description": "Example 1"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "DUPLICATE_REQUEST");
    assert_eq!(body["message"], "Duplicate request: Example 1");
}

#[tokio::test]
async fn test_error_stack_only_outside_production() {
    let (development, _sink) = test_server(Environment::Development);
    let body: Value = development.get("/api/v1/example/99").await.json();
    assert!(!body["stack"].as_str().unwrap().is_empty());

    let (production, _sink) = test_server(Environment::Production);
    let body: Value = production.get("/api/v1/example/99").await.json();
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn test_caller_request_id_echoed_as_context_id() {
    let (server, sink) = test_server(Environment::Development);
    let response = server
        .get("/v1/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc123"),
        )
        .await;

    let headers = response.headers();
    assert_eq!(headers.get("context-id").unwrap(), "abc123");

    // The access log line carries the same id.
    let access: Vec<Value> = sink
        .events()
        .into_iter()
        .filter(|event| event["logger"] == "access")
        .collect();
    assert_eq!(access.len(), 1);
    assert_eq!(access[0]["context_id"], "abc123");
}

#[tokio::test]
async fn test_context_id_generated_when_absent() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.get("/v1/health").await;
    let headers = response.headers();
    let generated = headers.get("context-id").unwrap();
    assert!(!generated.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_ids() {
    let (server, _sink) = test_server(Environment::Development);
    let (first, second) = tokio::join!(
        async { server.get("/v1/health").await },
        async { server.get("/v1/health").await }
    );

    let first_headers = first.headers();
    let second_headers = second.headers();
    let first_id = first_headers.get("context-id").unwrap().to_str().unwrap();
    let second_id = second_headers.get("context-id").unwrap().to_str().unwrap();
    assert!(!first_id.is_empty());
    assert!(!second_id.is_empty());
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn test_security_headers_present() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server.get("/v1/health").await;
    let headers = response.headers();

    let expected = [
        ("x-content-type-options", "nosniff"),
        ("x-dns-prefetch-control", "off"),
        ("x-frame-options", "DENY"),
        (
            "strict-transport-security",
            "max-age=5184000; includeSubDomains",
        ),
        ("x-download-options", "noopen"),
        ("x-xss-protection", "1; mode=block"),
    ];
    for (name, value) in expected {
        assert_eq!(
            headers.get(name).map(|v| v.to_str().unwrap()),
            Some(value),
            "header {name}"
        );
    }
}

#[tokio::test]
async fn test_cors_mirrors_origin_with_credentials() {
    let (server, _sink) = test_server(Environment::Development);
    let response = server
        .get("/v1/health")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://app.example.com"),
        )
        .await;
    let headers = response.headers();

    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("https://app.example.com")
    );
    assert_eq!(
        headers
            .get("access-control-allow-credentials")
            .map(|v| v.to_str().unwrap()),
        Some("true")
    );
}

#[tokio::test]
async fn test_access_log_records_request_outcome() {
    let (server, sink) = test_server(Environment::Development);
    server.get("/api/v1/example/1").await;

    let access: Vec<Value> = sink
        .events()
        .into_iter()
        .filter(|event| event["logger"] == "access")
        .collect();
    assert_eq!(access.len(), 1);
    let event = &access[0];
    assert_eq!(event["msg"], "[Request finished]");
    assert_eq!(event["method"], "GET");
    assert_eq!(event["path"], "/api/v1/example/1");
    assert_eq!(event["status"], 200);
    assert!(event["elapsed_ms"].as_u64().is_some());
}

#[tokio::test]
async fn test_handler_error_logged_once_with_context_id() {
    // Production keeps the error handler to a single log line.
    let (server, sink) = test_server(Environment::Production);
    server
        .get("/api/v1/example/99")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("err-ctx-1"),
        )
        .await;

    let errors = error_events(&sink);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["msg"], "[ErrHandler] example not found");
    assert_eq!(errors[0]["code"], "NOT_FOUND");
    assert_eq!(errors[0]["context_id"], "err-ctx-1");
}

async fn panicking_handler() -> &'static str {
    panic!("boom");
}

fn panic_server(environment: Environment) -> (TestServer, Arc<MemorySink>) {
    let (state, sink) = test_state(environment);
    let router = Router::new().route("/panic", get(panicking_handler));
    let app = apply_middleware(router, state);
    (TestServer::new(app).unwrap(), sink)
}

#[tokio::test]
async fn test_panic_recovered_as_internal_error() {
    let (server, sink) = panic_server(Environment::Production);
    let response = server.get("/panic").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "Internal Server Error");
    assert!(body.get("stack").is_none());

    // Exactly one ERROR event, carrying the panic detail and a stack.
    let errors = error_events(&sink);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["msg"], "[HTTP:Recover] panic boom");
    assert!(!errors[0]["stacktrace"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_panicked_request_still_gets_access_log() {
    let (server, sink) = panic_server(Environment::Production);
    server.get("/panic").await;

    // The panic unwinds past the timer before recovery renders the
    // 500, so the guard records an abort without a response status.
    let access: Vec<Value> = sink
        .events()
        .into_iter()
        .filter(|event| event["logger"] == "access")
        .collect();
    assert_eq!(access.len(), 1);
    assert_eq!(access[0]["msg"], "[Request aborted]");
    assert!(access[0].get("status").is_none());
    assert_eq!(access[0]["path"], "/panic");
}

async fn committed_with_late_error() -> Response {
    let mut response = (StatusCode::CREATED, Json(json!({"id": 1}))).into_response();
    record_error(&mut response, ServiceError::internal("late failure"));
    response
}

#[tokio::test]
async fn test_written_response_is_not_overwritten() {
    let (state, sink) = test_state(Environment::Production);
    let router = Router::new().route("/committed", get(committed_with_late_error));
    let server = TestServer::new(apply_middleware(router, state)).unwrap();

    let response = server.get("/committed").await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], 1);

    // The late error is still logged.
    let errors = error_events(&sink);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["msg"], "[ErrHandler] late failure");
}
