//! Key store access, key issuance and the cooldown gate.
//!
//! The `api_keys` table is the sole arbiter of key and owner uniqueness.
//! Issuance never locks client-side: it relies on the table's unique
//! constraints and resolves insert races with a retry-on-conflict loop.

use chrono::Utc;
use rand::Rng;

use crate::{db::DbPool, error::AppError, models::api_key::ApiKey};

/// Distinguished owner whose key authorizes privileged operations.
pub const ADMIN_OWNER: &str = "admin";

/// Prefix carried by every issued key.
pub const KEY_PREFIX: &str = "altgen-";

/// Random suffix length for regular owners.
const KEY_LENGTH: usize = 12;

/// Random suffix length for the admin key.
const ADMIN_KEY_LENGTH: usize = 32;

/// Alphabet the random suffix is drawn from.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXY";

/// Check whether a key is present in the store.
///
/// A store fault surfaces as an error: existence is then unknown, never
/// assumed true or false.
pub async fn key_exists(pool: &DbPool, key: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM api_keys WHERE api_key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Check whether an owner already holds a key.
pub async fn owner_exists(pool: &DbPool, owner: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM api_keys WHERE owner = ?)")
        .bind(owner)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Fetch the key issued to `owner`, if any.
pub async fn key_for_owner(pool: &DbPool, owner: &str) -> Result<Option<String>, AppError> {
    let key = sqlx::query_scalar("SELECT api_key FROM api_keys WHERE owner = ?")
        .bind(owner)
        .fetch_optional(pool)
        .await?;
    Ok(key)
}

/// Fetch the full record for a key, if it exists.
pub async fn get_record(pool: &DbPool, key: &str) -> Result<Option<ApiKey>, AppError> {
    let record = sqlx::query_as::<_, ApiKey>(
        "SELECT api_key, owner, created_at, last_used_at, use_count, disabled, notes
         FROM api_keys
         WHERE api_key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Check whether a key has been administratively disabled.
///
/// # Errors
///
/// Returns `InvalidKey` if the key does not exist.
pub async fn is_disabled(pool: &DbPool, key: &str) -> Result<bool, AppError> {
    let disabled: bool = sqlx::query_scalar("SELECT disabled FROM api_keys WHERE api_key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::InvalidKey)?;
    Ok(disabled)
}

/// Record a successful use of a key: stamp `last_used_at` and bump
/// `use_count`.
///
/// Called exactly once per successful item withdrawal, never on failed
/// attempts, never twice for one request.
///
/// # Errors
///
/// Returns `InvalidKey` if the key does not exist.
pub async fn touch(pool: &DbPool, key: &str, now: i64) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE api_keys SET last_used_at = ?, use_count = use_count + 1 WHERE api_key = ?",
    )
    .bind(now)
    .bind(key)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::InvalidKey);
    }
    Ok(())
}

/// Seconds until the key is eligible to generate again. Zero means eligible
/// now; a key that has never been used has no cooldown.
///
/// # Errors
///
/// Returns `InvalidKey` if the key does not exist.
pub async fn remaining_cooldown(
    pool: &DbPool,
    key: &str,
    cooldown_secs: i64,
) -> Result<i64, AppError> {
    let last_used_at: i64 = sqlx::query_scalar("SELECT last_used_at FROM api_keys WHERE api_key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::InvalidKey)?;

    let now = Utc::now().timestamp();
    Ok((last_used_at + cooldown_secs - now).max(0))
}

/// Issue a key for `owner`, or return the one they already hold.
///
/// Issuance is idempotent per owner: an owner never receives two different
/// keys. Uniqueness is guaranteed by the store's constraints, not by any
/// client-side lock: a conflicting concurrent insert for the same owner is
/// resolved by re-reading their key.
pub async fn issue_or_get(pool: &DbPool, owner: &str) -> Result<String, AppError> {
    issue_or_get_with_length(pool, owner, KEY_LENGTH).await
}

async fn issue_or_get_with_length(
    pool: &DbPool,
    owner: &str,
    key_length: usize,
) -> Result<String, AppError> {
    if let Some(key) = key_for_owner(pool, owner).await? {
        return Ok(key);
    }

    // Retry until a candidate sticks. The loop is logically unbounded: a
    // collision at length 12 over this alphabet is astronomically unlikely,
    // but a degenerate random source must not make issuance incorrect.
    loop {
        let candidate = random_key(key_length);
        if key_exists(pool, &candidate).await? {
            continue;
        }

        match insert_key(pool, &candidate, owner).await {
            Ok(()) => return Ok(candidate),
            Err(err) if err.is_unique_violation() => {
                // Benign race: either another caller issued this owner's key
                // concurrently (return theirs), or two candidates collided
                // (regenerate and retry).
                if let Some(key) = key_for_owner(pool, owner).await? {
                    return Ok(key);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Ensure the admin owner has a key, issuing one on first startup.
///
/// The freshly issued key is logged once for operator retrieval; this is the
/// only privileged-capability bootstrap in the system.
pub async fn ensure_admin_key(pool: &DbPool) -> Result<(), AppError> {
    if owner_exists(pool, ADMIN_OWNER).await? {
        tracing::debug!("admin key already provisioned");
        return Ok(());
    }

    let key = issue_or_get_with_length(pool, ADMIN_OWNER, ADMIN_KEY_LENGTH).await?;
    tracing::info!(key = %key, "provisioned admin api key");
    Ok(())
}

/// Validate a key for use: present, known, enabled and off cooldown.
///
/// Each rejection is a distinct reason so the caller can tell them apart:
/// `KeyNotSet`, `InvalidKey`, `KeyDisabled`, `CooldownActive(secs)`.
pub async fn validate_key(
    pool: &DbPool,
    cooldown_secs: i64,
    key: Option<&str>,
) -> Result<String, AppError> {
    let key = match key {
        Some(key) if !key.is_empty() => key,
        _ => return Err(AppError::KeyNotSet),
    };

    if !key_exists(pool, key).await? {
        return Err(AppError::InvalidKey);
    }

    if is_disabled(pool, key).await? {
        return Err(AppError::KeyDisabled);
    }

    let remaining = remaining_cooldown(pool, key, cooldown_secs).await?;
    if remaining > 0 {
        return Err(AppError::CooldownActive(remaining));
    }

    Ok(key.to_string())
}

/// Insert a fresh record for `key`/`owner` with default metadata.
async fn insert_key(pool: &DbPool, key: &str, owner: &str) -> Result<(), AppError> {
    sqlx::query("INSERT INTO api_keys (api_key, owner) VALUES (?, ?)")
        .bind(key)
        .bind(owner)
        .execute(pool)
        .await?;
    Ok(())
}

/// Generate a candidate key: prefix plus `length` random alphabet characters.
fn random_key(length: usize) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..length)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect();
    format!("{KEY_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;
    use std::collections::HashSet;

    #[test]
    fn random_keys_use_prefix_and_alphabet() {
        let key = random_key(12);
        let suffix = key.strip_prefix(KEY_PREFIX).expect("prefix present");
        assert_eq!(suffix.len(), 12);
        assert!(suffix.bytes().all(|b| KEY_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn issuance_is_idempotent_per_owner() {
        let (_dir, pool) = test_pool().await;

        let first = issue_or_get(&pool, "royalty").await.unwrap();
        let second = issue_or_get(&pool, "royalty").await.unwrap();
        assert_eq!(first, second);

        let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(records, 1);
    }

    #[tokio::test]
    async fn concurrent_issuance_yields_distinct_keys_per_owner() {
        let (_dir, pool) = test_pool().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                issue_or_get(&pool, &format!("owner-{i}")).await
            }));
        }

        let mut keys = HashSet::new();
        for handle in handles {
            let key = handle.await.unwrap().unwrap();
            assert!(keys.insert(key), "issued keys must be pairwise distinct");
        }

        // Repeated calls still map every owner to the same key.
        for i in 0..10 {
            let key = issue_or_get(&pool, &format!("owner-{i}")).await.unwrap();
            assert!(keys.contains(&key));
        }
    }

    #[tokio::test]
    async fn fresh_records_start_unused_and_enabled() {
        let (_dir, pool) = test_pool().await;

        let key = issue_or_get(&pool, "royalty").await.unwrap();
        let record = get_record(&pool, &key).await.unwrap().unwrap();
        assert_eq!(record.owner, "royalty");
        assert_eq!(record.last_used_at, 0);
        assert_eq!(record.use_count, 0);
        assert!(!record.disabled);
        assert!(record.created_at > 0);
    }

    #[tokio::test]
    async fn admin_bootstrap_provisions_one_long_key() {
        let (_dir, pool) = test_pool().await;

        ensure_admin_key(&pool).await.unwrap();
        ensure_admin_key(&pool).await.unwrap();

        let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(records, 1);

        let key = key_for_owner(&pool, ADMIN_OWNER).await.unwrap().unwrap();
        assert_eq!(key.len(), KEY_PREFIX.len() + 32);
    }

    #[tokio::test]
    async fn touch_stamps_last_use_and_bumps_count() {
        let (_dir, pool) = test_pool().await;

        let key = issue_or_get(&pool, "royalty").await.unwrap();
        touch(&pool, &key, 1_000).await.unwrap();
        touch(&pool, &key, 2_000).await.unwrap();

        let record = get_record(&pool, &key).await.unwrap().unwrap();
        assert_eq!(record.last_used_at, 2_000);
        assert_eq!(record.use_count, 2);
    }

    #[tokio::test]
    async fn touch_of_unknown_key_is_invalid() {
        let (_dir, pool) = test_pool().await;
        let err = touch(&pool, "altgen-MISSING", 1_000).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidKey));
    }

    #[tokio::test]
    async fn cooldown_counts_down_from_last_use() {
        let (_dir, pool) = test_pool().await;

        let key = issue_or_get(&pool, "royalty").await.unwrap();

        // Never used: no cooldown.
        assert_eq!(remaining_cooldown(&pool, &key, 300).await.unwrap(), 0);

        touch(&pool, &key, Utc::now().timestamp()).await.unwrap();
        let remaining = remaining_cooldown(&pool, &key, 300).await.unwrap();
        assert!(remaining > 0 && remaining <= 300);
    }

    #[tokio::test]
    async fn validate_rejects_each_failure_with_its_own_reason() {
        let (_dir, pool) = test_pool().await;

        assert!(matches!(
            validate_key(&pool, 300, None).await.unwrap_err(),
            AppError::KeyNotSet
        ));
        assert!(matches!(
            validate_key(&pool, 300, Some("")).await.unwrap_err(),
            AppError::KeyNotSet
        ));
        assert!(matches!(
            validate_key(&pool, 300, Some("altgen-MISSING")).await.unwrap_err(),
            AppError::InvalidKey
        ));

        let key = issue_or_get(&pool, "royalty").await.unwrap();
        assert_eq!(validate_key(&pool, 300, Some(&key)).await.unwrap(), key);

        touch(&pool, &key, Utc::now().timestamp()).await.unwrap();
        assert!(matches!(
            validate_key(&pool, 300, Some(&key)).await.unwrap_err(),
            AppError::CooldownActive(secs) if secs > 0 && secs <= 300
        ));

        // Disabled wins over everything else about the key's state.
        sqlx::query("UPDATE api_keys SET disabled = 1 WHERE api_key = ?")
            .bind(&key)
            .execute(&pool)
            .await
            .unwrap();
        assert!(matches!(
            validate_key(&pool, 300, Some(&key)).await.unwrap_err(),
            AppError::KeyDisabled
        ));
    }
}
