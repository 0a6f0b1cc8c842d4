//! Health check endpoints with component-level diagnostics.
//!
//! Provides:
//! - `/health` — simple "healthy" + version (for load balancers)
//! - `/health/detailed` — counter store and deletion queue status

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use wahook_core::{CounterStore, DeletionQueue};

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub store: ComponentHealth,
    pub queue: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
            details: None,
        }
    }

    fn healthy_with_details(latency_ms: u64, details: serde_json::Value) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
            details: Some(details),
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
            details: None,
        }
    }
}

/// Simple health check (for load balancers)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check with all component statuses
async fn detailed_health_check(
    Extension(store): Extension<Arc<dyn CounterStore>>,
    Extension(queue): Extension<Arc<dyn DeletionQueue>>,
) -> Json<DetailedHealthResponse> {
    let store_health = check_store(store.as_ref()).await;
    let queue_health = check_queue(queue.as_ref()).await;

    let components = [store_health.status, queue_health.status];
    let healthy_count = components.iter().filter(|s| **s == "healthy").count();

    let overall_status = if healthy_count == components.len() {
        "healthy"
    } else if healthy_count > 0 {
        "degraded"
    } else {
        "unhealthy"
    };

    Json(DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            store: store_health,
            queue: queue_health,
        },
    })
}

/// Check counter store connectivity
async fn check_store(store: &dyn CounterStore) -> ComponentHealth {
    let start = Instant::now();
    match store.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    }
}

/// Check deletion queue depth
async fn check_queue(queue: &dyn DeletionQueue) -> ComponentHealth {
    let start = Instant::now();
    match queue.pending().await {
        Ok(pending) => ComponentHealth::healthy_with_details(
            start.elapsed().as_millis() as u64,
            serde_json::json!({ "pending_jobs": pending }),
        ),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    }
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use wahook_core::{MemoryCounterStore, MemoryDeletionQueue, QrScanTracker};

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn memory_app() -> (Router, Arc<MemoryDeletionQueue>) {
        let store = Arc::new(MemoryCounterStore::new());
        let queue = Arc::new(MemoryDeletionQueue::new());
        let tracker = Arc::new(QrScanTracker::new(store.clone(), queue.clone()));
        (crate::api::app(tracker, store, queue.clone()), queue)
    }

    #[tokio::test]
    async fn test_simple_health() {
        let (router, _) = memory_app();
        let (status, body) = get_json(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_detailed_health_reports_queue_depth() {
        let (router, queue) = memory_app();
        queue.enqueue_session_deletion("inst-1").await.unwrap();

        let (status, body) = get_json(router, "/health/detailed").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["store"]["status"], "healthy");
        assert_eq!(body["checks"]["queue"]["details"]["pending_jobs"], 1);
    }

    #[tokio::test]
    async fn test_detailed_health_unreachable_redis() {
        let store: Arc<dyn CounterStore> =
            Arc::new(wahook_core::RedisCounterStore::new("redis://127.0.0.1:1").unwrap());
        let queue = Arc::new(MemoryDeletionQueue::new());
        let tracker = Arc::new(QrScanTracker::new(store.clone(), queue.clone()));
        let router = crate::api::app(tracker, store, queue);

        let (status, body) = get_json(router, "/health/detailed").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["store"]["status"], "unhealthy");
        assert!(body["checks"]["store"]["error"].is_string());
    }
}
