//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::cache;
use crate::analysis::engine::{run_analysis, AnalyzeRequest, AnalyzeResponse};
use crate::errors::AppError;
use crate::models::analysis::AnalysisRow;
use crate::state::AppState;
use crate::tiers::resolution;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// Summary view for history listings — the full result JSON stays out of
/// the list payload.
#[derive(Serialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub match_score: i32,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AnalysisRow> for AnalysisSummary {
    fn from(row: AnalysisRow) -> Self {
        AnalysisSummary {
            id: row.id,
            match_score: row.match_score,
            matched_keywords: row.matched_keywords,
            missing_keywords: row.missing_keywords,
            created_at: row.created_at,
        }
    }
}

/// POST /api/v1/analysis
///
/// Full analysis pipeline: validate → tier gate → fingerprint cache →
/// provider → persist. Identical (user, resume, JD) input is served from
/// the cache with `"cached": true` and no provider call.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let response = run_analysis(&state.db, state.provider.as_ref(), request).await?;
    Ok(Json(response))
}

/// GET /api/v1/analysis/history?user_id=
///
/// Past analysis summaries, newest first. Pro-gated.
pub async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<AnalysisSummary>>, AppError> {
    if !resolution::has_feature_access(&state.db, params.user_id, "analysis_history").await? {
        return Err(AppError::Forbidden);
    }

    let rows = cache::list_for_user(&state.db, params.user_id).await?;
    Ok(Json(rows.into_iter().map(AnalysisSummary::from).collect()))
}
