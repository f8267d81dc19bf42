//! Key validation endpoint.

use crate::{error::AppError, services::key_service, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ValidateParams {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub owner: String,
}

/// Check whether a key is currently usable for generation.
///
/// # Endpoint
///
/// `GET /api/v1/validate?key=<key>`
///
/// # Response
///
/// - **Success (200 OK)**: `{ "valid": true, "owner": "royalty" }`
/// - Otherwise the same reason-coded rejections the generate endpoint uses:
///   `key_not_set`, `invalid_key`, `key_disabled`, `cooldown_active`
pub async fn validate(
    State(state): State<AppState>,
    Query(params): Query<ValidateParams>,
) -> Result<Json<ValidateResponse>, AppError> {
    let key =
        key_service::validate_key(&state.pool, state.cooldown_secs, params.key.as_deref()).await?;

    // validate_key guarantees the record exists at this point.
    let owner = key_service::get_record(&state.pool, &key)
        .await?
        .map(|record| record.owner)
        .ok_or(AppError::InvalidKey)?;

    Ok(Json(ValidateResponse { valid: true, owner }))
}
