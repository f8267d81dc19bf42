//! Inventory item model.

/// One redeemable credential pair from the `stock` table.
///
/// Items are inserted by restock, consumed (read + deleted) by exactly one
/// successful generate call, and never mutated. The `(email, password)` pair
/// is unique across the table; `id` exists only to target deletions.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Alt {
    pub id: i64,
    pub email: String,
    pub password: String,
}

impl Alt {
    /// The `email:password` combo form callers paste into tooling.
    pub fn combo(&self) -> String {
        format!("{}:{}", self.email, self.password)
    }
}
