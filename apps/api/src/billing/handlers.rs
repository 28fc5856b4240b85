//! Axum route handlers for plans and payments.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::lifecycle::{self, VerifyOutcome};
use crate::errors::AppError;
use crate::models::subscription::{PlanRow, SubscriptionRow};
use crate::models::user::UserRow;
use crate::state::AppState;
use crate::tiers::Tier;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    pub user_id: Uuid,
    /// Plan tier being purchased ("pro" or "enterprise").
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct InitializePaymentResponse {
    pub reference: String,
    pub authorization_url: String,
    pub amount_cents: i64,
    pub currency: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/plans
///
/// Seeded subscription plans, cheapest first. Read-only reference data.
pub async fn handle_list_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlanRow>>, AppError> {
    let plans =
        sqlx::query_as::<_, PlanRow>("SELECT * FROM subscription_plans ORDER BY rank ASC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(plans))
}

/// GET /api/v1/users/:id/subscription
///
/// The user's currently covering subscription, if any. Highest-rank
/// unexpired active subscription wins, matching tier resolution.
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Option<SubscriptionRow>>, AppError> {
    let subscription = sqlx::query_as::<_, SubscriptionRow>(
        r#"
        SELECT s.*
        FROM subscriptions s
        JOIN subscription_plans p ON p.id = s.plan_id
        WHERE s.user_id = $1
          AND s.status = 'active'
          AND (s.ends_at IS NULL OR s.ends_at > NOW())
        ORDER BY p.rank DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(subscription))
}

/// POST /api/v1/payments/initialize
///
/// Creates a pending transaction + pending subscription and starts a
/// gateway checkout. Nothing activates until the payment verifies.
pub async fn handle_initialize_payment(
    State(state): State<AppState>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>, AppError> {
    if request.tier == Tier::Free || request.tier == Tier::Admin {
        return Err(AppError::Validation(format!(
            "Tier '{}' is not purchasable",
            request.tier
        )));
    }

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(request.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.user_id)))?;

    let plan = sqlx::query_as::<_, PlanRow>("SELECT * FROM subscription_plans WHERE tier = $1")
        .bind(request.tier.as_str())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No plan for tier '{}'", request.tier)))?;

    // Our reference, handed to the gateway, so the verify callback always
    // finds a transaction row.
    let reference = Uuid::new_v4().to_string();
    let subscription_id = Uuid::new_v4();

    let mut db_tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, plan_id, status, gateway_reference)
        VALUES ($1, $2, $3, 'pending', $4)
        "#,
    )
    .bind(subscription_id)
    .bind(user.id)
    .bind(plan.id)
    .bind(&reference)
    .execute(&mut *db_tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO payment_transactions
            (id, user_id, subscription_id, amount_cents, currency, status, gateway_reference)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(subscription_id)
    .bind(plan.price_cents)
    .bind(&plan.currency)
    .bind(&reference)
    .execute(&mut *db_tx)
    .await?;

    db_tx.commit().await?;

    let initialized = state
        .payments
        .initialize(&user.email, plan.price_cents, &reference)
        .await?;

    Ok(Json(InitializePaymentResponse {
        reference: initialized.reference,
        authorization_url: initialized.authorization_url,
        amount_cents: plan.price_cents,
        currency: plan.currency,
    }))
}

/// GET /api/v1/payments/verify/:reference
///
/// Verifies the transaction at the gateway and applies the outcome.
/// Idempotent: a settled reference reports its recorded outcome without a
/// second activation.
pub async fn handle_verify_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<VerifyOutcome>, AppError> {
    let verification = state.payments.verify(&reference).await?;
    let outcome = lifecycle::apply_verification(&state.db, &reference, &verification).await?;
    Ok(Json(outcome))
}
