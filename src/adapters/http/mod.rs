//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure.
//! [`app_router`] assembles them with the cross-cutting layers.

use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub mod subscription;

// Re-export key types for convenience
pub use subscription::subscription_router;
pub use subscription::SubscriptionAppState;

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

/// Build the complete application router.
///
/// Requests running longer than `request_timeout` are answered with 408.
pub fn app_router(state: SubscriptionAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", subscription_router())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
