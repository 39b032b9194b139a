//! HTTP server assembly shared by `main.rs` and the integration tests.

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregation::AggregationState;
use crate::config::CorsConfig;
use crate::rest;

// Health check handler
#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Build the CORS layer from configuration.
#[must_use]
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors_origins = &config.allowed_origins;
    let allow_origin: AllowOrigin = if cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow any origin - not recommended for production");
        AllowOrigin::any()
    } else if cors_origins.is_empty() {
        tracing::info!(
            "CORS allowed origins not configured - cross-origin requests will be blocked"
        );
        AllowOrigin::list(Vec::<HeaderValue>::new())
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        tracing::info!(origins = ?cors_origins, "CORS allowed origins configured");
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(allow_origin)
}

/// The full application router.
pub fn build_app(state: AggregationState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(rest::router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors))
}
