//! Stock status endpoint.

use crate::{error::AppError, services::stock_service, state::AppState};
use axum::{Json, extract::State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Number of items currently available for generation
    pub stock: i64,
}

/// Report how many items are currently in stock.
///
/// # Endpoint
///
/// `GET /api/v1/status`. Public, no key required.
///
/// # Response
///
/// ```json
/// { "stock": 42 }
/// ```
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let stock = stock_service::stock_count(&state.pool).await?;
    Ok(Json(StatusResponse { stock }))
}
