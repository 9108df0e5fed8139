use tracing::info;

/// Liveness probe, kept deliberately dependency-free.
pub async fn health_handler() -> &'static str {
    info!("Health check requested");
    "Healthy"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler_returns_healthy() {
        assert_eq!(health_handler().await, "Healthy");
    }
}
