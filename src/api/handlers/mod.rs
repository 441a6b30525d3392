//! Request handlers, one module per resource.

use axum::{Json, response::IntoResponse};
use tracing::trace;

pub mod chats;
pub mod gigs;
pub mod milestones;

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    trace!("health check: ok");
    Json(serde_json::json!({
        "status": "healthy",
    }))
}
