use std::time::Duration;

use axum::http::{Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Cross-origin policy: every origin is admitted (mirrored back,
/// since credentialed requests forbid the wildcard), the common
/// methods and headers are allowed, and preflight results are cached
/// for a day.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::HEAD,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}
