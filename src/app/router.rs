use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};

use crate::app::state::AppState;
use crate::handler::{create_example, get_example, health_handler};
use crate::middleware::{
    context_middleware, cors_layer, error_handler, recovery, request_timer, security_headers,
};

/// Builds the full application router: routes plus the interceptor
/// chain.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/v1/health", get(health_handler))
        .route("/api/v1/example", post(create_example))
        .route("/api/v1/example/{example_id}", get(get_example))
        .with_state(state.clone());
    apply_middleware(routes, state)
}

/// Wraps a router in the interceptor chain. Layers apply inside-out:
/// the last `.layer()` call runs first, so requests flow context,
/// recovery, timer, CORS, security headers, error handler, handler.
pub fn apply_middleware(router: Router, state: AppState) -> Router {
    router
        .layer(from_fn_with_state(state.clone(), error_handler))
        .layer(from_fn(security_headers))
        .layer(cors_layer())
        .layer(from_fn_with_state(state.clone(), request_timer))
        .layer(from_fn_with_state(state, recovery))
        .layer(from_fn(context_middleware))
}
