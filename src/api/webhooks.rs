//! Webhook handlers for the WhatsApp gateway
//!
//! The gateway posts every session event for an instance to
//! `/api/webhooks/whatsapp/:instance_id`. QR events feed the scan tracker,
//! anything else resets it.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use wahook_core::{QrScanTracker, TrackerAction, WebhookEvent};

/// Acknowledgment returned to the gateway
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub action: Option<TrackerAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle a gateway webhook (POST)
///
/// Tracker failures are absorbed, so a well-formed event is always answered
/// with 200 and the gateway never retries because of bookkeeping.
async fn whatsapp_webhook(
    Path(instance_id): Path<String>,
    Extension(tracker): Extension<Arc<QrScanTracker>>,
    payload: Result<Json<WebhookEvent>, JsonRejection>,
) -> (StatusCode, Json<WebhookAck>) {
    let event = match payload {
        Ok(Json(event)) => event,
        Err(rejection) => {
            warn!(instance_id = %instance_id, error = %rejection.body_text(), "Malformed webhook body");
            return (
                rejection.status(),
                Json(WebhookAck {
                    received: false,
                    action: None,
                    error: Some(rejection.body_text()),
                }),
            );
        }
    };

    debug!(
        instance_id = %instance_id,
        event = %event.event,
        session = %event.session,
        "Received gateway webhook"
    );

    let action = tracker.handle_event(&instance_id, &event).await;

    (
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            action: Some(action),
            error: None,
        }),
    )
}

/// Create webhook routes
pub fn webhooks_routes() -> Router {
    Router::new().route(
        "/api/webhooks/whatsapp/:instance_id",
        post(whatsapp_webhook),
    )
}
