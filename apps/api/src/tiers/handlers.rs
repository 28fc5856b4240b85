//! Axum route handlers for tier and feature-gate queries.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::tiers::{resolution, Tier};

#[derive(Serialize)]
pub struct TierResponse {
    pub tier: Tier,
    pub rank: i32,
}

#[derive(Serialize)]
pub struct FeatureAccessResponse {
    pub feature: String,
    pub allowed: bool,
}

/// GET /api/v1/users/:id/tier
pub async fn handle_get_tier(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TierResponse>, AppError> {
    let tier = resolution::resolve_tier(&state.db, user_id).await?;
    Ok(Json(TierResponse {
        tier,
        rank: tier.rank(),
    }))
}

/// GET /api/v1/users/:id/features/:feature
pub async fn handle_feature_access(
    State(state): State<AppState>,
    Path((user_id, feature)): Path<(Uuid, String)>,
) -> Result<Json<FeatureAccessResponse>, AppError> {
    let allowed = resolution::has_feature_access(&state.db, user_id, &feature).await?;
    Ok(Json(FeatureAccessResponse { feature, allowed }))
}
