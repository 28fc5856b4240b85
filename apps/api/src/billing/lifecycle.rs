//! Subscription lifecycle — the transition rules and their application to
//! the database.
//!
//! The decision of what a verification outcome does to a pending
//! transaction is a pure function (`decide_transition`), so idempotence
//! and the terminal states are testable without a database.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::billing::gateway::{GatewayStatus, GatewayVerification};
use crate::errors::AppError;
use crate::models::payment::PaymentTransactionRow;

/// Activation window stamped on a subscription at verification time.
/// Plans carry no duration of their own; every paid window is 30 days.
pub const SUBSCRIPTION_DAYS: i64 = 30;

/// What a gateway verification does to a transaction in `current_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Mark the transaction successful and activate the linked subscription.
    Activate,
    /// Terminal failure; no activation.
    MarkFailed,
    /// User abandoned checkout; terminal, no activation.
    MarkCancelled,
    /// Nothing to do — still pending at the gateway, or already finalized
    /// (re-verifying a settled reference is a no-op, never a re-activation).
    NoChange,
}

/// The gateway's settled amount must equal what the transaction was opened
/// for. A "successful" payment of the wrong amount or currency never
/// activates anything.
pub fn amounts_match(
    expected_cents: i64,
    expected_currency: &str,
    verification: &GatewayVerification,
) -> bool {
    verification.amount_cents == expected_cents
        && verification.currency.eq_ignore_ascii_case(expected_currency)
}

pub fn decide_transition(current_status: &str, gateway: GatewayStatus) -> Transition {
    // Only a pending transaction can move. Every other status is terminal,
    // which is what makes verification idempotent.
    if current_status != "pending" {
        return Transition::NoChange;
    }
    match gateway {
        GatewayStatus::Success => Transition::Activate,
        GatewayStatus::Failed => Transition::MarkFailed,
        GatewayStatus::Cancelled => Transition::MarkCancelled,
        GatewayStatus::Pending => Transition::NoChange,
    }
}

/// Outcome reported to the caller of the verify endpoint.
#[derive(Debug, serde::Serialize)]
pub struct VerifyOutcome {
    pub reference: String,
    pub transaction_status: String,
    pub subscription_activated: bool,
    /// True when this call found the transaction already settled.
    pub already_finalized: bool,
}

/// Applies a gateway verification to the stored transaction and its linked
/// subscription. Safe to call repeatedly with the same reference.
pub async fn apply_verification(
    pool: &PgPool,
    reference: &str,
    verification: &GatewayVerification,
) -> Result<VerifyOutcome, AppError> {
    let tx_row = sqlx::query_as::<_, PaymentTransactionRow>(
        "SELECT * FROM payment_transactions WHERE gateway_reference = $1",
    )
    .bind(reference)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Transaction {reference} not found")))?;

    let transition = decide_transition(&tx_row.status, verification.status);

    // The row stays pending on a mismatch so it can be investigated;
    // nothing here finalizes it.
    if transition == Transition::Activate
        && !amounts_match(tx_row.amount_cents, &tx_row.currency, verification)
    {
        return Err(AppError::Payment(format!(
            "Gateway settled {} {} for reference {reference}, expected {} {}",
            verification.amount_cents, verification.currency, tx_row.amount_cents, tx_row.currency
        )));
    }

    let (new_status, activated) = match transition {
        Transition::Activate => ("success", true),
        Transition::MarkFailed => ("failed", false),
        Transition::MarkCancelled => ("cancelled", false),
        Transition::NoChange => {
            return Ok(VerifyOutcome {
                reference: reference.to_string(),
                transaction_status: tx_row.status.clone(),
                subscription_activated: false,
                already_finalized: tx_row.status != "pending",
            });
        }
    };

    let mut db_tx = pool.begin().await?;

    sqlx::query("UPDATE payment_transactions SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(new_status)
        .bind(tx_row.id)
        .execute(&mut *db_tx)
        .await?;

    if activated {
        let subscription_id = tx_row.subscription_id.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Transaction {reference} has no linked subscription"
            ))
        })?;

        let starts_at = Utc::now();
        let ends_at = starts_at + Duration::days(SUBSCRIPTION_DAYS);

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'active', starts_at = $1, ends_at = $2
            WHERE id = $3
            "#,
        )
        .bind(starts_at)
        .bind(ends_at)
        .bind(subscription_id)
        .execute(&mut *db_tx)
        .await?;

        // Promote the fallback role so tier resolution survives even if the
        // subscription row is ever cleaned up early.
        sqlx::query(
            r#"
            UPDATE users u
            SET role = p.tier
            FROM subscriptions s
            JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.id = $1 AND u.id = s.user_id AND u.role <> 'admin'
            "#,
        )
        .bind(subscription_id)
        .execute(&mut *db_tx)
        .await?;

        info!("Activated subscription {subscription_id} via reference {reference}");
    }

    db_tx.commit().await?;

    Ok(VerifyOutcome {
        reference: reference.to_string(),
        transaction_status: new_status.to_string(),
        subscription_activated: activated,
        already_finalized: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_plus_success_activates() {
        assert_eq!(
            decide_transition("pending", GatewayStatus::Success),
            Transition::Activate
        );
    }

    #[test]
    fn test_pending_plus_failed_fails() {
        assert_eq!(
            decide_transition("pending", GatewayStatus::Failed),
            Transition::MarkFailed
        );
    }

    #[test]
    fn test_pending_plus_cancelled_cancels() {
        assert_eq!(
            decide_transition("pending", GatewayStatus::Cancelled),
            Transition::MarkCancelled
        );
    }

    #[test]
    fn test_pending_plus_gateway_pending_waits() {
        assert_eq!(
            decide_transition("pending", GatewayStatus::Pending),
            Transition::NoChange
        );
    }

    fn verification(amount_cents: i64, currency: &str) -> GatewayVerification {
        GatewayVerification {
            status: GatewayStatus::Success,
            amount_cents,
            currency: currency.to_string(),
        }
    }

    #[test]
    fn test_amounts_match_exact() {
        assert!(amounts_match(500000, "NGN", &verification(500000, "NGN")));
    }

    #[test]
    fn test_amounts_match_currency_case_insensitive() {
        assert!(amounts_match(500000, "NGN", &verification(500000, "ngn")));
    }

    #[test]
    fn test_short_settled_amount_rejected() {
        assert!(!amounts_match(500000, "NGN", &verification(499999, "NGN")));
    }

    #[test]
    fn test_wrong_currency_rejected() {
        assert!(!amounts_match(500000, "NGN", &verification(500000, "USD")));
    }

    #[test]
    fn test_reverify_settled_reference_is_noop() {
        // Second verification of "R123" must not re-activate.
        for settled in ["success", "failed", "cancelled", "refunded"] {
            assert_eq!(
                decide_transition(settled, GatewayStatus::Success),
                Transition::NoChange,
                "status {settled} moved"
            );
        }
    }
}
