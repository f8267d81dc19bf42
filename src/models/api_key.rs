//! API key record model.
//!
//! A record is created exactly once, on first issuance for an owner, and is
//! never deleted by normal operation. `disabled`, `last_used_at` and
//! `use_count` are the only fields that change afterwards.

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `api_key`: the opaque token itself, primary key
/// - `owner`: who the key was issued to (unique, one key per owner)
/// - `created_at`: creation time, seconds since epoch
/// - `last_used_at`: last successful generate, seconds since epoch (0 = never)
/// - `use_count`: successful generates performed with this key
/// - `disabled`: administratively set; the engine never sets this itself
/// - `notes`: free-form annotation with no semantic effect
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub api_key: String,
    pub owner: String,
    pub created_at: i64,
    pub last_used_at: i64,
    pub use_count: i64,
    pub disabled: bool,
    pub notes: String,
}
