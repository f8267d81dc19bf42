//! Business logic services.
//!
//! The services own all reads and writes against the durable store; the
//! handlers above them only translate HTTP to and from these calls.

/// Generate orchestration (dedup, validation, withdrawal, touch)
pub mod generate_service;
/// Key store access, key issuance and the cooldown gate
pub mod key_service;
/// Inventory store access (count, withdraw, restock, refund)
pub mod stock_service;
