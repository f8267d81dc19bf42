//! Inventory store access.
//!
//! The `stock` table holds the finite pool of redeemable credential pairs.
//! Withdrawal is a single DELETE .. RETURNING statement, so the "read one
//! item, delete that item" pair is indivisible at the store level: no two
//! concurrent withdrawals can receive the same item, and an item is never
//! observed as both returned and still present.

use crate::{db::DbPool, error::AppError, models::alt::Alt};

/// Number of items currently available. Never negative.
pub async fn stock_count(pool: &DbPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Atomically take one item out of the pool and return it.
///
/// # Errors
///
/// Returns `OutOfStock` when the pool is empty: an expected, frequent
/// condition, not a fault.
pub async fn withdraw_one(pool: &DbPool) -> Result<Alt, AppError> {
    sqlx::query_as::<_, Alt>(
        "DELETE FROM stock
         WHERE id = (SELECT id FROM stock ORDER BY id LIMIT 1)
         RETURNING id, email, password",
    )
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::OutOfStock)
}

/// Insert one item into the pool.
///
/// Returns `Ok(false)` if the pair is already in stock (the unique
/// constraint rejected it), `Ok(true)` on a fresh insert.
pub async fn add_one(pool: &DbPool, email: &str, password: &str) -> Result<bool, AppError> {
    let result = sqlx::query("INSERT INTO stock (email, password) VALUES (?, ?)")
        .bind(email)
        .bind(password)
        .execute(pool)
        .await;

    match result.map_err(AppError::from) {
        Ok(_) => Ok(true),
        Err(err) if err.is_unique_violation() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Best-effort bulk import of newline-delimited `email:password` pairs.
///
/// Per line: surrounding whitespace (and any carriage return) is stripped;
/// lines without exactly one `:` are skipped and not counted. Well-formed
/// lines count toward `total`; duplicates already in stock count toward
/// `total` but not `added`. A non-duplicate store fault aborts the batch and
/// surfaces to the caller; rows inserted before the fault stay inserted,
/// this is not a transactional batch.
///
/// Returns `(added, total)`.
pub async fn bulk_load(pool: &DbPool, text: &str) -> Result<(u64, u64), AppError> {
    let mut added = 0u64;
    let mut total = 0u64;

    for line in text.lines() {
        let line = line.trim();
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 2 {
            continue;
        }
        total += 1;

        if add_one(pool, fields[0], fields[1]).await? {
            tracing::debug!(email = fields[0], "added stock item");
            added += 1;
        } else {
            tracing::warn!(email = fields[0], "skipping duplicate stock item");
        }
    }

    Ok((added, total))
}

/// Re-insert a previously withdrawn item.
///
/// Compensation for a generate that withdrew an item and then failed
/// downstream; not a rollback primitive. The caller logs a failure here
/// rather than retrying.
pub async fn refund_one(pool: &DbPool, alt: &Alt) -> Result<(), AppError> {
    sqlx::query("INSERT INTO stock (email, password) VALUES (?, ?)")
        .bind(&alt.email)
        .bind(&alt.password)
        .execute(pool)
        .await?;
    Ok(())
}
