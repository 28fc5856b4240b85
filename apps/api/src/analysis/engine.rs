//! Analysis orchestration: validate → gate-filter → fingerprint → cache →
//! provider → persist.
//!
//! The persist step is a side effect, not the deliverable: if the insert
//! fails after a successful provider call, the computed result is still
//! returned to the user and the failure is only logged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::cache::{self, StoreParams};
use crate::analysis::fingerprint::fingerprint;
use crate::analysis::provider::{AnalysisOutcome, AnalysisProvider};
use crate::errors::AppError;
use crate::models::analysis::AnalysisRow;
use crate::tiers::{features, resolution, Tier};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub resume_text: String,
    pub jd_text: String,
    /// Premium section names to include, e.g. "skills_gap_assessment".
    /// Sections above the user's tier are silently dropped, not errors.
    #[serde(default)]
    pub requested_sections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Missing when the row could not be persisted (the result still is).
    pub analysis_id: Option<Uuid>,
    /// True when served from a prior stored record.
    pub cached: bool,
    pub tier: Tier,
    /// Sections present in `result`: the gate-filtered list sent to the
    /// provider on a fresh run, or the sections the stored row was
    /// generated with on a cache hit.
    pub sections_included: Vec<String>,
    pub match_score: i32,
    pub result: Value,
}

/// Drops requested sections the tier may not use. Order is preserved and
/// duplicates collapse, so the provider sees each section once.
pub fn filter_sections(requested: &[String], tier: Tier) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for section in requested {
        if features::tier_allows(tier, section) && !kept.contains(section) {
            kept.push(section.clone());
        }
    }
    kept
}

/// Section names carried by a stored result payload.
fn cached_sections(result: &Value) -> Vec<String> {
    result
        .get("sections")
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

/// Outcome of the cache-or-provider step.
enum Served {
    Cached(AnalysisRow),
    Fresh(AnalysisOutcome),
}

/// Serves from the cache when a row exists; only a miss reaches the
/// provider. Split from `run_analysis` so the idempotence guarantee is
/// testable without a live pool.
async fn serve_analysis(
    cached: Option<AnalysisRow>,
    provider: &dyn AnalysisProvider,
    resume_text: &str,
    jd_text: &str,
    sections: &[String],
) -> Result<Served, AppError> {
    if let Some(row) = cached {
        return Ok(Served::Cached(row));
    }
    let outcome = provider.analyze(resume_text, jd_text, sections).await?;
    Ok(Served::Fresh(outcome))
}

pub async fn run_analysis(
    pool: &PgPool,
    provider: &dyn AnalysisProvider,
    req: AnalyzeRequest,
) -> Result<AnalyzeResponse, AppError> {
    // Validation failures block before any external call is made.
    if req.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    if req.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let tier = resolution::resolve_tier(pool, req.user_id).await?;
    let sections = filter_sections(&req.requested_sections, tier);

    let resume_hash = fingerprint(&req.resume_text);
    let jd_hash = fingerprint(&req.jd_text);

    let cached = cache::find_cached(pool, req.user_id, &resume_hash, &jd_hash).await?;

    let outcome = match serve_analysis(
        cached,
        provider,
        &req.resume_text,
        &req.jd_text,
        &sections,
    )
    .await?
    {
        Served::Cached(row) => {
            info!("Cache hit for user {} ({resume_hash:.8}…)", req.user_id);
            return Ok(AnalyzeResponse {
                analysis_id: Some(row.id),
                cached: true,
                tier,
                sections_included: cached_sections(&row.result),
                match_score: row.match_score,
                result: row.result,
            });
        }
        Served::Fresh(outcome) => outcome,
    };

    let match_score = outcome.score()?;
    let matched = outcome.present_keywords();
    let missing = outcome.missing_keywords();

    let result = serde_json::to_value(&outcome)
        .map_err(|e| AppError::Llm(format!("Unserializable analysis result: {e}")))?;

    let analysis_id = match cache::store_result(
        pool,
        StoreParams {
            user_id: req.user_id,
            resume_hash: &resume_hash,
            jd_hash: &jd_hash,
            result: &result,
            match_score,
            matched_keywords: &matched,
            missing_keywords: &missing,
        },
    )
    .await
    {
        Ok(row) => Some(row.id),
        // The save is a side effect; the computed analysis is still shown.
        Err(e) => {
            error!("Failed to persist analysis for user {}: {e}", req.user_id);
            None
        }
    };

    Ok(AnalyzeResponse {
        analysis_id,
        cached: false,
        tier,
        sections_included: sections,
        match_score,
        result,
    })
}
