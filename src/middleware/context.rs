use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::logger::RequestContext;

/// Inbound header whose value, when present, becomes the correlation
/// id for the request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Outbound header echoing the correlation id to the client.
pub const CONTEXT_ID_HEADER: &str = "context-id";

/// Establishes the correlation context for a request: adopts the
/// caller-supplied `X-Request-Id` or generates a fresh id, stores the
/// context in request extensions for downstream middleware and
/// handlers, and stamps the id onto the response as `Context-ID`.
pub async fn context_middleware(mut request: Request, next: Next) -> Response {
    let ctx = match request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(id) if !id.is_empty() => RequestContext::with_id(id),
        _ => RequestContext::new(),
    };
    let context_id = ctx.context_id().to_string();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&context_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CONTEXT_ID_HEADER), value);
    }
    response
}

/// Extractor form of the correlation context. Falls back to a fresh
/// context when the middleware did not run, so handlers can always
/// rely on having one.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
