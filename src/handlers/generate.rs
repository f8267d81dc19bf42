//! Generate endpoint: dispense one inventory item to a key holder.

use std::net::SocketAddr;

use crate::{error::AppError, services::generate_service, state::AppState};
use axum::{
    Json,
    extract::{ConnectInfo, Query, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub email: String,
    pub password: String,
    /// Convenience `email:password` form
    pub combo: String,
}

/// Dispense one credential pair to the holder of `key`.
///
/// # Endpoint
///
/// `GET /api/v1/generate?key=<key>`
///
/// # Caller identity
///
/// The client IP (from `ConnectInfo`) is the deduplication identity: one
/// outstanding generate per address, enforced before anything else runs.
///
/// # Response
///
/// - **Success (200 OK)**:
///   `{ "email": "...", "password": "...", "combo": "email:password" }`
/// - **Rejections**: `already_requesting` (429), `key_not_set` (400),
///   `invalid_key` (401), `key_disabled` (403), `cooldown_active` (429,
///   message carries the seconds remaining), `out_of_stock` (200, a normal
///   business outcome, the pool simply ran dry)
pub async fn generate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerateResponse>, AppError> {
    let identity = addr.ip().to_string();
    let alt = generate_service::generate(&state, params.key.as_deref(), &identity).await?;

    Ok(Json(GenerateResponse {
        combo: alt.combo(),
        email: alt.email,
        password: alt.password,
    }))
}
