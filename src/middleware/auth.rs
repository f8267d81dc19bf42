//! Admin API key authentication middleware.
//!
//! The restock endpoint loads raw credential inventory and is the one
//! privileged operation in the system. This middleware intercepts requests
//! to it and:
//! 1. Extracts the API key from the Authorization header
//! 2. Looks the key up and checks that it is enabled
//! 3. Rejects keys that do not belong to the admin owner
//! 4. Injects an authentication context into the request

use crate::{error::AppError, models::api_key::ApiKey, services::key_service, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Authentication context attached to authenticated admin requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Owner of the authenticated key (always the admin owner today)
    pub owner: String,
}

/// Admin authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Fetch the key record; unknown keys are rejected with 401
/// 3. Disabled keys are rejected with 403
/// 4. Keys owned by anyone but `admin` are rejected with 403
/// 5. Otherwise inject `AuthContext` and call the next handler
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer altgen-ABC...
/// ```
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract the bearer token from the Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::KeyNotSet)?;

    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::KeyNotSet)?;

    // Look the key up in the store
    let record: ApiKey = key_service::get_record(&state.pool, api_key)
        .await?
        .ok_or(AppError::InvalidKey)?;

    if record.disabled {
        return Err(AppError::KeyDisabled);
    }

    if record.owner != key_service::ADMIN_OWNER {
        return Err(AppError::AdminRequired);
    }

    // Route handlers can extract this using Extension<AuthContext>
    request.extensions_mut().insert(AuthContext {
        owner: record.owner,
    });

    Ok(next.run(request).await)
}
