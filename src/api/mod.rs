//! Web API module for wahook
//!
//! Provides:
//! - Webhook receiver for the WhatsApp gateway
//! - Health checks

pub mod health;
pub mod webhooks;

use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wahook_core::{CounterStore, DeletionQueue, QrScanTracker};

pub use health::health_routes;
pub use webhooks::webhooks_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(webhooks_routes())
}

/// Full application: routes plus shared state and request tracing
pub fn app(
    tracker: Arc<QrScanTracker>,
    store: Arc<dyn CounterStore>,
    queue: Arc<dyn DeletionQueue>,
) -> Router {
    api_router()
        .route("/", get(|| async { "wahook" }))
        .layer(Extension(tracker))
        .layer(Extension(store))
        .layer(Extension(queue))
        .layer(TraceLayer::new_for_http())
}
