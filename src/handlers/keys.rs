//! Key issuance endpoint.

use crate::{error::AppError, services::key_service, state::AppState};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    /// Identity to issue the key to; one key per owner
    pub owner: String,
}

#[derive(Debug, Serialize)]
pub struct CreateKeyResponse {
    pub key: String,
    pub owner: String,
}

/// Issue a key for an owner, or return the one they already hold.
///
/// # Endpoint
///
/// `POST /api/v1/keys`
///
/// # Request Body
///
/// ```json
/// { "owner": "royalty" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{ "key": "altgen-...", "owner": "royalty" }`;
///   repeated calls for the same owner return the identical key
/// - **Error (400)**: owner missing or empty
/// - **Error (500)**: store fault
pub async fn create_key(
    State(state): State<AppState>,
    Json(request): Json<CreateKeyRequest>,
) -> Result<Json<CreateKeyResponse>, AppError> {
    if request.owner.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "owner must not be empty".to_string(),
        ));
    }

    let key = key_service::issue_or_get(&state.pool, request.owner.trim()).await?;

    Ok(Json(CreateKeyResponse {
        key,
        owner: request.owner.trim().to_string(),
    }))
}
