//! Inventory restock endpoint (admin only).

use crate::{
    error::AppError, middleware::auth::AuthContext, services::stock_service, state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RestockResponse {
    /// Items actually inserted
    pub added: u64,
    /// Well-formed lines attempted (duplicates included)
    pub total: u64,
}

/// Bulk-load credential pairs into the inventory.
///
/// # Endpoint
///
/// `POST /api/v1/restock`: multipart form with a text field/file named
/// `alts` containing newline-delimited `email:password` pairs.
///
/// # Authentication
///
/// Guarded by the admin middleware: requires `Authorization: Bearer <key>`
/// where the key belongs to the admin owner and is not disabled.
///
/// # Response
///
/// - **Success (200 OK)**: `{ "added": 95, "total": 100 }`; malformed lines
///   are skipped silently, duplicates count toward `total` only
/// - **Error (400)**: no `alts` field in the upload
/// - **Error (500)**: store fault mid-batch (earlier inserts stay applied)
pub async fn restock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<Json<RestockResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::InvalidRequest(format!("invalid multipart form: {err}")))?
    {
        if field.name() != Some("alts") {
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|err| AppError::InvalidRequest(format!("unreadable alts field: {err}")))?;

        tracing::info!(owner = %auth.owner, bytes = text.len(), "restock requested");
        let (added, total) = stock_service::bulk_load(&state.pool, &text).await?;
        tracing::info!(added, total, "restock complete");

        return Ok(Json(RestockResponse { added, total }));
    }

    Err(AppError::InvalidRequest(
        "missing alts field in multipart form".to_string(),
    ))
}
