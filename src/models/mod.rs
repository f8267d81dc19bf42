//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// API key record model
pub mod api_key;
/// Inventory item ("alt") model
pub mod alt;
