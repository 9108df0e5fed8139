use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use spor::logger::{
    self, Attr, ConfigError, FileSinkConfig, Logger, LoggerConfig, RequestContext, Severity,
};
use spor::port::LogSink;
use spor::test_support::MemorySink;
use tempfile::TempDir;

async fn read_events(path: &Path) -> Vec<Value> {
    let contents = tokio::fs::read_to_string(path).await.unwrap();
    contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn two_file_config(dir: &TempDir) -> LoggerConfig {
    LoggerConfig {
        threshold: Severity::Debug,
        enable_stdout: false,
        enable_file: true,
        file_sinks: vec![
            FileSinkConfig {
                path: dir.path().join("app.log"),
                ..FileSinkConfig::default()
            },
            FileSinkConfig {
                path: dir.path().join("access.log"),
                is_access_log: true,
                ..FileSinkConfig::default()
            },
        ],
        ..LoggerConfig::default()
    }
}

#[tokio::test]
async fn test_app_and_access_events_route_to_their_files() {
    let dir = TempDir::new().unwrap();
    let logger = Logger::new(two_file_config(&dir)).await.unwrap();

    logger.info("application event", vec![Attr::new("n", 1)]);
    logger.access("[Request finished]", vec![Attr::new("status", 200)]);
    logger.shutdown().await;

    let app_events = read_events(&dir.path().join("app.log")).await;
    assert_eq!(app_events.len(), 1);
    assert_eq!(app_events[0]["msg"], "application event");
    assert!(app_events[0].get("logger").is_none());

    let access_events = read_events(&dir.path().join("access.log")).await;
    assert_eq!(access_events.len(), 1);
    assert_eq!(access_events[0]["logger"], "access");
    assert_eq!(access_events[0]["status"], 200);
}

#[tokio::test]
async fn test_bound_fields_and_context_reach_the_file() {
    let dir = TempDir::new().unwrap();
    let logger = Logger::new(two_file_config(&dir)).await.unwrap();
    let child = logger.with_fields(vec![Attr::new("service", "spor")]);

    let ctx = RequestContext::with_id("file-ctx");
    child.warn_ctx(&ctx, "disk pressure", vec![Attr::new("free_mb", 12)]);
    logger.shutdown().await;

    let events = read_events(&dir.path().join("app.log")).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "warn");
    assert_eq!(events[0]["context_id"], "file-ctx");
    assert_eq!(events[0]["service"], "spor");
    assert_eq!(events[0]["free_mb"], 12);
}

#[tokio::test]
async fn test_file_sink_level_list_filters_events() {
    let dir = TempDir::new().unwrap();
    let config = LoggerConfig {
        threshold: Severity::Debug,
        enable_stdout: false,
        enable_file: true,
        file_sinks: vec![FileSinkConfig {
            path: dir.path().join("errors.log"),
            levels: vec![Severity::Error],
            ..FileSinkConfig::default()
        }],
        ..LoggerConfig::default()
    };
    let logger = Logger::new(config).await.unwrap();

    logger.info("kept out", Vec::new());
    logger.error("kept in", Vec::new());
    logger.shutdown().await;

    let events = read_events(&dir.path().join("errors.log")).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["msg"], "kept in");
}

#[tokio::test]
async fn test_buffered_lines_survive_immediate_shutdown() {
    let dir = TempDir::new().unwrap();
    let logger = Logger::new(two_file_config(&dir)).await.unwrap();

    for i in 0..25 {
        logger.info(&format!("burst {i}"), Vec::new());
    }
    logger.shutdown().await;

    let events = read_events(&dir.path().join("app.log")).await;
    assert_eq!(events.len(), 25);
}

#[tokio::test]
async fn test_logger_requires_at_least_one_sink() {
    let config = LoggerConfig {
        enable_stdout: false,
        ..LoggerConfig::default()
    };
    let result = Logger::new(config).await;
    assert!(matches!(result, Err(ConfigError::NoSinkEnabled)));
}

#[tokio::test]
async fn test_default_logger_surface() {
    let sink = Arc::new(MemorySink::new());
    let sinks: Vec<Arc<dyn LogSink>> = vec![sink.clone()];
    logger::set_default(Logger::with_sinks(Severity::Debug, false, sinks));

    logger::info("through default", Vec::new());
    let ctx = RequestContext::with_id("default-ctx");
    logger::error_ctx(&ctx, "default error", Vec::new());

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["msg"], "through default");
    assert_eq!(events[1]["context_id"], "default-ctx");

    logger::shutdown_default().await;
    // Unset default: logging is a no-op and repeat shutdown is safe.
    logger::info("dropped silently", Vec::new());
    logger::shutdown_default().await;
    assert_eq!(sink.events().len(), 2);
}
