//! Tier resolution: effective tier = best active subscription, else the
//! user's fallback role, else free.
//!
//! Resolution hits the database on every call. A downgraded or expired
//! subscription takes effect on the very next call — no cached tier value
//! is ever trusted across calls.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::ActiveSubscription;
use crate::tiers::{features, Tier};

/// Resolves the effective tier for `user_id`.
pub async fn resolve_tier(pool: &PgPool, user_id: Uuid) -> Result<Tier, AppError> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let role = role.ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    let candidates = sqlx::query_as::<_, ActiveSubscription>(
        r#"
        SELECT p.tier, p.rank, s.ends_at
        FROM subscriptions s
        JOIN subscription_plans p ON p.id = s.plan_id
        WHERE s.user_id = $1 AND s.status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(pick_tier(&candidates, &role, Utc::now()))
}

/// Feature gate: resolve the tier, then check the static matrix.
/// The (tier, feature) decision itself is pure — see `features::tier_allows`.
pub async fn has_feature_access(
    pool: &PgPool,
    user_id: Uuid,
    feature: &str,
) -> Result<bool, AppError> {
    let tier = resolve_tier(pool, user_id).await?;
    Ok(features::tier_allows(tier, feature))
}

/// Pure selection over fetched candidates.
///
/// Highest-rank unexpired active subscription wins; the single-active-
/// subscription invariant should make ties impossible, but the tie-break
/// is defined anyway. With no covering subscription the fallback role
/// applies, and an unknown role string bottoms out at free.
fn pick_tier(candidates: &[ActiveSubscription], fallback_role: &str, now: DateTime<Utc>) -> Tier {
    candidates
        .iter()
        .filter(|s| s.ends_at.map(|end| end > now).unwrap_or(true))
        .max_by_key(|s| s.rank)
        .map(|s| Tier::parse(&s.tier))
        .unwrap_or_else(|| Tier::parse(fallback_role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sub(tier: &str, rank: i32, ends_in_days: Option<i64>) -> ActiveSubscription {
        ActiveSubscription {
            tier: tier.to_string(),
            rank,
            ends_at: ends_in_days.map(|d| Utc::now() + Duration::days(d)),
        }
    }

    #[test]
    fn test_no_subscription_falls_back_to_role() {
        assert_eq!(pick_tier(&[], "pro", Utc::now()), Tier::Pro);
        assert_eq!(pick_tier(&[], "free", Utc::now()), Tier::Free);
    }

    #[test]
    fn test_unknown_fallback_role_is_free() {
        assert_eq!(pick_tier(&[], "gold", Utc::now()), Tier::Free);
    }

    #[test]
    fn test_active_subscription_beats_role() {
        let subs = vec![sub("pro", 1, Some(10))];
        assert_eq!(pick_tier(&subs, "free", Utc::now()), Tier::Pro);
    }

    #[test]
    fn test_expired_end_date_ignored() {
        // Status still says active but the window has closed; resolution
        // must not grant the tier even before the sweep flips the row.
        let subs = vec![sub("pro", 1, Some(-1))];
        assert_eq!(pick_tier(&subs, "free", Utc::now()), Tier::Free);
    }

    #[test]
    fn test_open_ended_subscription_counts() {
        let subs = vec![sub("enterprise", 2, None)];
        assert_eq!(pick_tier(&subs, "free", Utc::now()), Tier::Enterprise);
    }

    #[test]
    fn test_tie_break_highest_rank_wins() {
        let subs = vec![sub("pro", 1, Some(5)), sub("enterprise", 2, Some(5))];
        assert_eq!(pick_tier(&subs, "free", Utc::now()), Tier::Enterprise);
    }

    #[test]
    fn test_expired_high_rank_loses_to_live_low_rank() {
        let subs = vec![sub("enterprise", 2, Some(-3)), sub("pro", 1, Some(5))];
        assert_eq!(pick_tier(&subs, "free", Utc::now()), Tier::Pro);
    }
}
