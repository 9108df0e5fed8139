use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app::router::build_router;
use crate::app::state::AppState;
use crate::error::AppError;

/// Binds the listener and serves until a shutdown signal arrives.
pub async fn serve(state: AppState, port: u16) -> Result<(), AppError> {
    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| AppError::Bind {
            address: address.clone(),
            source,
        })?;

    info!("HTTP server listening on {address}");
    info!("  Health:          GET  /v1/health");
    info!("  Create example:  POST /api/v1/example");
    info!("  Fetch example:   GET  /api/v1/example/{{example_id}}");

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives. A handler that cannot be
/// installed is logged and simply never fires, rather than aborting
/// startup.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
