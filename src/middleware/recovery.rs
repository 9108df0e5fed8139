use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures::FutureExt;

use crate::app::state::AppState;
use crate::error::{ServiceError, render_error_response};

/// Catches panics escaping the rest of the chain, logs one ERROR event
/// with the panic detail and a captured stack, and answers with the
/// generic internal error body instead of tearing the connection down.
pub async fn recovery(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let context_id = request
        .extensions()
        .get::<crate::logger::RequestContext>()
        .map(|ctx| ctx.context_id().to_string());

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let error = ServiceError::internal("Internal Server Error");
            state.logger.error_with_stacktrace(
                context_id.as_deref(),
                &format!("[HTTP:Recover] panic {}", panic_detail(panic)),
                error.stacktrace().to_string(),
                Vec::new(),
            );
            render_error_response(&error, state.environment)
        }
    }
}

fn panic_detail(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(message) => *message,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}
