//! Shared application state.
//!
//! Everything a handler needs is carried here and injected via Axum's
//! `State` extractor: the database pool, the in-flight deduplication set and
//! the configured cooldown duration.

use std::sync::Arc;

use crate::{db::DbPool, inflight::InFlight};

/// State shared by all request handlers.
///
/// Cloning is cheap: the pool and the in-flight set are both reference
/// counted internally.
#[derive(Debug, Clone)]
pub struct AppState {
    /// SQLite connection pool, the single source of truth for keys and stock
    pub pool: DbPool,

    /// Caller identities with a generate operation currently outstanding
    pub inflight: Arc<InFlight>,

    /// Minimum interval between successful generates per key, in seconds
    pub cooldown_secs: i64,
}

impl AppState {
    pub fn new(pool: DbPool, cooldown_secs: i64) -> Self {
        Self {
            pool,
            inflight: InFlight::new(),
            cooldown_secs,
        }
    }
}
