use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::state::AppState;
use crate::error::{ErrorResponsePending, ServiceError, render_error_response};
use crate::logger::{Attr, RequestContext, Severity};

/// Single point translating recorded domain errors into wire
/// responses. Logs every recorded error once, tied to the correlation
/// id, then renders the `{code, message}` body unless a handler
/// already wrote one (first writer wins).
pub async fn error_handler(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ctx = request.extensions().get::<RequestContext>().cloned();
    let mut response = next.run(request).await;

    let pending = response
        .extensions_mut()
        .remove::<ErrorResponsePending>()
        .is_some();
    let Some(error) = response.extensions_mut().remove::<ServiceError>() else {
        return response;
    };

    let context_id = ctx.as_ref().map(|ctx| ctx.context_id());
    state.logger.log(
        Severity::Error,
        &format!("[ErrHandler] {}", error.message()),
        vec![
            Attr::new("code", error.code()),
            Attr::new("error", error.to_string()),
        ],
        context_id,
    );
    if !state.environment.is_production() {
        state.logger.log(
            Severity::Error,
            "[ErrHandler] stacktrace",
            vec![Attr::new("stack", error.stacktrace())],
            context_id,
        );
    }

    if pending {
        render_error_response(&error, state.environment)
    } else {
        response
    }
}
