pub mod router;
pub mod server;
pub mod state;
pub mod tracing;

pub use state::AppState;

use crate::config;
use crate::error::AppError;
use crate::healthcheck;
use crate::logger::{self, Attr, Logger};

/// Application entry point: loads configuration, brings up the logger,
/// assembles state, and serves until shutdown. Invoked with the
/// `healthcheck` argument it instead probes a running instance, for
/// use as a container healthcheck.
pub async fn run() -> Result<(), AppError> {
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        return healthcheck::run_healthcheck().await;
    }

    self::tracing::init_tracing();

    let settings = config::get_configuration()?;
    let logger = Logger::new(settings.logger.clone()).await?.with_fields(vec![
        Attr::new("service", env!("CARGO_PKG_NAME")),
        Attr::new("version", env!("CARGO_PKG_VERSION")),
    ]);
    logger::set_default(logger.clone());

    logger.info("starting application with in-memory repository", Vec::new());
    let state = AppState::new(logger.clone(), settings.server.environment);

    let result = server::serve(state, settings.server.http_port).await;

    logger.info("server stopped, flushing logs", Vec::new());
    logger::shutdown_default().await;
    result
}
