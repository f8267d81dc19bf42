//! HTTP request handlers (route implementations).
//!
//! Handlers only translate between HTTP and the services; every invariant is
//! enforced below them.

/// Generate endpoint (dispense one item)
pub mod generate;
/// Health check endpoint
pub mod health;
/// Key issuance endpoint
pub mod keys;
/// Inventory restock endpoint (admin only)
pub mod restock;
/// Stock status endpoint
pub mod status;
/// Key validation endpoint
pub mod validate;
