use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Internal diagnostics for the scaffold itself (sink workers, server
/// lifecycle). Application logging goes through [`crate::logger`].
/// JSON output by default; set `RUST_LOG_FORMAT=text` for a
/// human-readable form and `RUST_LOG` to adjust the filter.
pub fn init_tracing() {
    let use_json = std::env::var("RUST_LOG_FORMAT")
        .map(|format| format != "text")
        .unwrap_or(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
