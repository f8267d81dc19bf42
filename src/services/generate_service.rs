//! Generate orchestration.
//!
//! One successful generate call dispenses exactly one inventory item and
//! consumes exactly one cooldown window. The stages run in a fixed order,
//! each with its own failure exit:
//!
//! ```text
//! DedupCheck -> KeyValidate -> CooldownCheck -> Withdraw -> Touch -> Respond
//! ```
//!
//! The in-flight slot acquired at `DedupCheck` is held in an RAII guard, so
//! it is released on every exit path.

use chrono::Utc;

use crate::{
    error::AppError,
    models::alt::Alt,
    services::{key_service, stock_service},
    state::AppState,
};

/// Run one generate operation for `identity` using `key`.
///
/// # Stages
///
/// 1. Reject with `AlreadyRequesting` if the identity already has a call in
///    flight; otherwise mark it busy for the duration of this call.
/// 2. Validate the key (`KeyNotSet` / `InvalidKey` / `KeyDisabled` /
///    `CooldownActive`).
/// 3. Withdraw one item; an empty pool is `OutOfStock`, a normal outcome.
/// 4. Touch the key, but only after a successful withdrawal, so cooldown is
///    never consumed without a dispensed item. If the touch faults, the
///    withdrawn item is refunded best-effort and the fault surfaces.
pub async fn generate(state: &AppState, key: Option<&str>, identity: &str) -> Result<Alt, AppError> {
    let _guard = state
        .inflight
        .try_acquire(identity)
        .ok_or(AppError::AlreadyRequesting)?;

    let key = key_service::validate_key(&state.pool, state.cooldown_secs, key).await?;

    let alt = stock_service::withdraw_one(&state.pool).await?;

    if let Err(err) = key_service::touch(&state.pool, &key, Utc::now().timestamp()).await {
        // Compensating action, not a rollback: put the item back so a fault
        // here does not burn stock. A second failure must not mask the
        // first, so it is logged and dropped.
        if let Err(refund_err) = stock_service::refund_one(&state.pool, &alt).await {
            tracing::error!(
                error = %refund_err,
                email = %alt.email,
                "failed to refund item after touch fault"
            );
        }
        return Err(err);
    }

    Ok(alt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::test_pool;
    use crate::state::AppState;

    const COOLDOWN: i64 = 300;

    async fn seeded_state() -> (tempfile::TempDir, AppState, String) {
        let (dir, pool) = test_pool().await;
        let key = key_service::issue_or_get(&pool, "royalty").await.unwrap();
        stock_service::add_one(&pool, "a@x.com", "p1").await.unwrap();
        (dir, AppState::new(pool, COOLDOWN), key)
    }

    #[tokio::test]
    async fn successful_generate_dispenses_and_touches() {
        let (_dir, state, key) = seeded_state().await;

        let alt = generate(&state, Some(&key), "10.0.0.1").await.unwrap();
        assert_eq!(alt.combo(), "a@x.com:p1");
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 0);

        let record = key_service::get_record(&state.pool, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.use_count, 1);
        assert!(record.last_used_at > 0);
    }

    #[tokio::test]
    async fn immediate_second_generate_hits_the_cooldown() {
        let (_dir, state, key) = seeded_state().await;
        stock_service::add_one(&state.pool, "b@x.com", "p2")
            .await
            .unwrap();

        generate(&state, Some(&key), "10.0.0.1").await.unwrap();
        let err = generate(&state, Some(&key), "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::CooldownActive(secs) if secs > 0 && secs <= COOLDOWN));

        // The rejected attempt consumed nothing.
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 1);
        let record = key_service::get_record(&state.pool, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.use_count, 1);
    }

    #[tokio::test]
    async fn an_elapsed_cooldown_allows_the_next_generate() {
        let (_dir, pool) = test_pool().await;
        let key = key_service::issue_or_get(&pool, "royalty").await.unwrap();
        stock_service::add_one(&pool, "a@x.com", "p1").await.unwrap();
        stock_service::add_one(&pool, "b@x.com", "p2").await.unwrap();

        // Zero-length cooldown expires immediately.
        let state = AppState::new(pool, 0);
        generate(&state, Some(&key), "10.0.0.1").await.unwrap();
        let alt = generate(&state, Some(&key), "10.0.0.1").await.unwrap();
        assert_eq!(alt.combo(), "b@x.com:p2");

        let record = key_service::get_record(&state.pool, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.use_count, 2);
    }

    #[tokio::test]
    async fn missing_and_unknown_keys_are_distinct_rejections() {
        let (_dir, state, _key) = seeded_state().await;

        assert!(matches!(
            generate(&state, None, "10.0.0.1").await.unwrap_err(),
            AppError::KeyNotSet
        ));
        assert!(matches!(
            generate(&state, Some("altgen-MISSING"), "10.0.0.1")
                .await
                .unwrap_err(),
            AppError::InvalidKey
        ));
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn disabled_key_is_rejected_regardless_of_stock() {
        let (_dir, state, key) = seeded_state().await;
        sqlx::query("UPDATE api_keys SET disabled = 1 WHERE api_key = ?")
            .bind(&key)
            .execute(&state.pool)
            .await
            .unwrap();

        let err = generate(&state, Some(&key), "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::KeyDisabled));
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_pool_reports_out_of_stock_without_touching_the_key() {
        let (_dir, state, key) = seeded_state().await;
        stock_service::withdraw_one(&state.pool).await.unwrap();

        let err = generate(&state, Some(&key), "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::OutOfStock));

        let record = key_service::get_record(&state.pool, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.use_count, 0);
        assert_eq!(record.last_used_at, 0);
    }

    #[tokio::test]
    async fn a_busy_identity_is_rejected_and_freed_afterwards() {
        let (_dir, state, key) = seeded_state().await;

        let held = state.inflight.try_acquire("10.0.0.1").unwrap();
        let err = generate(&state, Some(&key), "10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyRequesting));
        // Rejection at the dedup stage mutates nothing.
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 1);

        drop(held);
        generate(&state, Some(&key), "10.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn a_failed_generate_releases_its_inflight_slot() {
        let (_dir, state, _key) = seeded_state().await;

        let err = generate(&state, Some("altgen-MISSING"), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidKey));
        assert!(state.inflight.try_acquire("10.0.0.1").is_some());
    }

    #[tokio::test]
    async fn concurrent_generates_drain_the_pool_exactly_once() {
        let (_dir, pool) = test_pool().await;
        for i in 0..4 {
            stock_service::add_one(&pool, &format!("user{i}@x.com"), "secret")
                .await
                .unwrap();
        }
        let state = AppState::new(pool, COOLDOWN);

        // Distinct keys and identities so neither the cooldown nor the dedup
        // gate interferes with the stock invariant under test.
        let mut handles = Vec::new();
        for i in 0..6 {
            let state = state.clone();
            let key = key_service::issue_or_get(&state.pool, &format!("owner-{i}"))
                .await
                .unwrap();
            handles.push(tokio::spawn(async move {
                generate(&state, Some(&key), &format!("10.0.0.{i}")).await
            }));
        }

        let mut combos = std::collections::HashSet::new();
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(alt) => {
                    assert!(combos.insert(alt.combo()));
                }
                Err(AppError::OutOfStock) => out_of_stock += 1,
                Err(err) => panic!("unexpected generate error: {err}"),
            }
        }
        assert_eq!(combos.len(), 4);
        assert_eq!(out_of_stock, 2);
        assert_eq!(stock_service::stock_count(&state.pool).await.unwrap(), 0);
    }
}
