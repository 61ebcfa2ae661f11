use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// Restricts browsers to the Mini App origin when one is configured.
pub fn cors_layer(webapp_url: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let Some(origin) = webapp_url.map(|u| u.trim_end_matches('/')) else {
        return base.allow_origin(Any);
    };
    match HeaderValue::from_str(origin) {
        Ok(value) => base.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "WEBAPP_URL is not a valid origin, allowing any");
            base.allow_origin(Any)
        }
    }
}
