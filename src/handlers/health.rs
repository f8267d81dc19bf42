//! Health check endpoint.

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
///
/// # Endpoint
///
/// `GET /health`. No authentication, no database access.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
