//! Periodic subscription sweep.
//!
//! Three passes: `active` subscriptions whose end date has passed become
//! `expired`; `pending` subscriptions abandoned at checkout for too long
//! become `expired` (a late successful verification re-activates them, so
//! this is recoverable); users left without a covering active subscription
//! are demoted to the `free` role. Tier resolution already ignores overdue
//! rows (see `resolution::pick_tier`), so the sweep is about keeping the
//! stored state honest, not about correctness of the gate.
//!
//! Each pass fetches candidates and applies a pure decision function, so
//! the rules are testable without a database.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

/// How long a `pending` subscription may sit before the sweep expires it.
pub const STALE_PENDING_DAYS: i64 = 7;

#[derive(Debug, FromRow)]
struct SweepSubscription {
    id: Uuid,
    ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct SweepPending {
    id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SweepUser {
    id: Uuid,
    role: String,
    has_cover: bool,
}

/// An active subscription's paid window has closed. Open-ended
/// subscriptions (no end date) never expire.
pub fn window_closed(ends_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    ends_at.map(|end| end <= now).unwrap_or(false)
}

/// A pending subscription has sat unverified past the checkout window.
pub fn pending_stale(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at >= chrono::Duration::days(STALE_PENDING_DAYS)
}

/// A paid fallback role with no live subscription behind it gets demoted.
/// Admin is never granted by subscription and is never demoted.
pub fn should_demote(role: &str, has_cover: bool) -> bool {
    matches!(role, "pro" | "enterprise") && !has_cover
}

/// Results of one sweep pass.
#[derive(Debug, Default)]
pub struct SweepStats {
    pub expired: u64,
    pub stale_pending: u64,
    pub demoted: u64,
}

/// Runs one sweep pass.
pub async fn expire_overdue_subscriptions(pool: &PgPool) -> Result<SweepStats> {
    let now = Utc::now();
    let mut stats = SweepStats::default();

    let active = sqlx::query_as::<_, SweepSubscription>(
        "SELECT id, ends_at FROM subscriptions WHERE status = 'active'",
    )
    .fetch_all(pool)
    .await?;
    let overdue: Vec<Uuid> = active
        .iter()
        .filter(|s| window_closed(s.ends_at, now))
        .map(|s| s.id)
        .collect();
    stats.expired = mark_expired(pool, &overdue).await?;

    let pending = sqlx::query_as::<_, SweepPending>(
        "SELECT id, created_at FROM subscriptions WHERE status = 'pending'",
    )
    .fetch_all(pool)
    .await?;
    let stale: Vec<Uuid> = pending
        .iter()
        .filter(|s| pending_stale(s.created_at, now))
        .map(|s| s.id)
        .collect();
    stats.stale_pending = mark_expired(pool, &stale).await?;

    let candidates = sqlx::query_as::<_, SweepUser>(
        r#"
        SELECT u.id, u.role,
               EXISTS (
                   SELECT 1 FROM subscriptions s
                   WHERE s.user_id = u.id
                     AND s.status = 'active'
                     AND (s.ends_at IS NULL OR s.ends_at > NOW())
               ) AS has_cover
        FROM users u
        WHERE u.role IN ('pro', 'enterprise')
        "#,
    )
    .fetch_all(pool)
    .await?;
    let demote: Vec<Uuid> = candidates
        .iter()
        .filter(|u| should_demote(&u.role, u.has_cover))
        .map(|u| u.id)
        .collect();
    if !demote.is_empty() {
        stats.demoted = sqlx::query("UPDATE users SET role = 'free' WHERE id = ANY($1)")
            .bind(&demote)
            .execute(pool)
            .await?
            .rows_affected();
    }

    if stats.expired > 0 || stats.stale_pending > 0 || stats.demoted > 0 {
        info!(
            "Sweep: expired {} subscription(s), cleared {} stale pending, demoted {} user(s)",
            stats.expired, stats.stale_pending, stats.demoted
        );
    }

    Ok(stats)
}

async fn mark_expired(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    Ok(
        sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?
            .rows_affected(),
    )
}

/// Spawns the background sweep loop. A failed pass is logged and retried
/// at the next tick; it never takes the process down.
pub fn spawn_sweep_task(pool: PgPool, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = expire_overdue_subscriptions(&pool).await {
                error!("Subscription sweep failed: {e:?}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_closed_past_end_date() {
        let now = Utc::now();
        assert!(window_closed(Some(now - Duration::days(1)), now));
        assert!(window_closed(Some(now), now));
    }

    #[test]
    fn test_window_open_future_end_date() {
        let now = Utc::now();
        assert!(!window_closed(Some(now + Duration::days(30)), now));
    }

    #[test]
    fn test_open_ended_subscription_never_expires() {
        assert!(!window_closed(None, Utc::now()));
    }

    #[test]
    fn test_pending_stale_after_checkout_window() {
        let now = Utc::now();
        assert!(pending_stale(now - Duration::days(STALE_PENDING_DAYS + 1), now));
        assert!(!pending_stale(now - Duration::days(1), now));
        assert!(!pending_stale(now, now));
    }

    #[test]
    fn test_uncovered_paid_role_demoted() {
        assert!(should_demote("pro", false));
        assert!(should_demote("enterprise", false));
    }

    #[test]
    fn test_covered_paid_role_kept() {
        assert!(!should_demote("pro", true));
        assert!(!should_demote("enterprise", true));
    }

    #[test]
    fn test_admin_and_free_never_demoted() {
        assert!(!should_demote("admin", false));
        assert!(!should_demote("free", false));
    }
}
