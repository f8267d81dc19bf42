//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible outcomes short of success. Each variant
/// maps to a specific HTTP status code and error code string.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from the durable store, logged
///   with context, surfaced to the caller as a generic failure
/// - **Validation Errors**: Missing or malformed input (`KeyNotSet`,
///   `InvalidRequest`), reported to the caller, never logged as faults
/// - **Key-State Errors**: Expected store-state mismatches (`InvalidKey`,
///   `KeyDisabled`), reported with a specific reason, not escalated
/// - **Business Outcomes**: `CooldownActive`, `AlreadyRequesting` and
///   `OutOfStock` are normal, expected results of a generate attempt
///
/// Nothing here is fatal to the process; every operation returns a typed
/// outcome rather than terminating the server.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller identity already has a generate operation in flight.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Already requesting")]
    AlreadyRequesting,

    /// No API key was supplied with the request.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Key not set")]
    KeyNotSet,

    /// The supplied API key does not exist.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid key")]
    InvalidKey,

    /// The key exists but has been administratively disabled.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Key disabled")]
    KeyDisabled,

    /// The key's cooldown has not elapsed yet; the payload is the number of
    /// seconds remaining until the key is eligible again.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Cooldown active ({0}s remaining)")]
    CooldownActive(i64),

    /// The inventory is empty.
    ///
    /// Returns HTTP 200 OK: running dry is a routine business outcome that
    /// callers poll for, not a server fault.
    #[error("Out of stock")]
    OutOfStock,

    /// The key is valid but does not belong to the admin owner.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Admin key required")]
    AdminRequired,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::AlreadyRequesting => (
                StatusCode::TOO_MANY_REQUESTS,
                "already_requesting",
                self.to_string(),
            ),
            AppError::KeyNotSet => (StatusCode::BAD_REQUEST, "key_not_set", self.to_string()),
            AppError::InvalidKey => (StatusCode::UNAUTHORIZED, "invalid_key", self.to_string()),
            AppError::KeyDisabled => (StatusCode::FORBIDDEN, "key_disabled", self.to_string()),
            AppError::CooldownActive(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "cooldown_active",
                self.to_string(),
            ),
            // An empty inventory is reported as a successful request with a
            // distinct reason code, not as a client or server error.
            AppError::OutOfStock => (StatusCode::OK, "out_of_stock", self.to_string()),
            AppError::AdminRequired => (StatusCode::FORBIDDEN, "admin_required", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref err) => {
                // Log the fault with context; the client only sees a generic
                // failure message.
                tracing::error!(error = %err, "database fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

impl AppError {
    /// True iff this error wraps a database unique-constraint violation.
    ///
    /// The issuance and restock paths use this to distinguish a benign
    /// duplicate (another writer got there first) from a genuine store fault.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    }
}
