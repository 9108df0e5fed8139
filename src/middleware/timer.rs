use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::state::AppState;
use crate::logger::{Attr, Logger, RequestContext};

/// Emits one access-log event per request with method, path, status,
/// and elapsed time. The event is written from a drop guard, so a
/// request whose client went away is still recorded, just without a
/// response status.
pub async fn request_timer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut guard = AccessGuard {
        logger: state.logger.clone(),
        context_id: request
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.context_id().to_string()),
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        started: Instant::now(),
        status: None,
    };

    let response = next.run(request).await;
    guard.status = Some(response.status().as_u16());
    response
}

struct AccessGuard {
    logger: Logger,
    context_id: Option<String>,
    method: String,
    path: String,
    started: Instant,
    status: Option<u16>,
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        let mut attrs = vec![
            Attr::new("method", self.method.as_str()),
            Attr::new("path", self.path.as_str()),
        ];
        if let Some(status) = self.status {
            attrs.push(Attr::new("status", status));
        }
        attrs.push(Attr::new(
            "elapsed_ms",
            self.started.elapsed().as_millis() as u64,
        ));
        let message = if self.status.is_some() {
            "[Request finished]"
        } else {
            "[Request aborted]"
        };

        match &self.context_id {
            Some(id) => {
                let ctx = RequestContext::with_id(id.clone());
                self.logger.access_ctx(&ctx, message, attrs);
            }
            None => self.logger.access(message, attrs),
        }
    }
}
