//! HTTP interceptor chain. Outermost to innermost: correlation
//! context, panic recovery, request timer, CORS, security headers,
//! error handling. Each piece is an `axum::middleware::from_fn`
//! function (or a tower layer) with the `(request, next) -> response`
//! contract.

pub mod context;
pub mod cors;
pub mod error_handler;
pub mod recovery;
pub mod secure;
pub mod timer;

pub use context::{CONTEXT_ID_HEADER, REQUEST_ID_HEADER, context_middleware};
pub use cors::cors_layer;
pub use error_handler::error_handler;
pub use recovery::recovery;
pub use secure::security_headers;
pub use timer::request_timer;
