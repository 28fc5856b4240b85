//! Result cache — lookup and persistence of analysis rows keyed by
//! (user, resume fingerprint, JD fingerprint).
//!
//! Rows are written once and never updated. Two identical requests racing
//! on the same key may both miss and both invoke the provider; the UNIQUE
//! constraint plus `ON CONFLICT DO NOTHING` guarantees at most one row
//! wins, and both callers converge on it via the re-select.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::AnalysisRow;

/// Looks up a cached analysis. `None` is a miss (the normal flow); any
/// other failure propagates.
pub async fn find_cached(
    pool: &PgPool,
    user_id: Uuid,
    resume_hash: &str,
    jd_hash: &str,
) -> Result<Option<AnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, AnalysisRow>(
        r#"
        SELECT * FROM analysis_results
        WHERE user_id = $1 AND resume_hash = $2 AND jd_hash = $3
        "#,
    )
    .bind(user_id)
    .bind(resume_hash)
    .bind(jd_hash)
    .fetch_optional(pool)
    .await?)
}

/// Parameters for persisting a freshly computed analysis.
pub struct StoreParams<'a> {
    pub user_id: Uuid,
    pub resume_hash: &'a str,
    pub jd_hash: &'a str,
    pub result: &'a serde_json::Value,
    pub match_score: i32,
    pub matched_keywords: &'a [String],
    pub missing_keywords: &'a [String],
}

/// Persists a new analysis row and returns the row that owns the key —
/// which is the concurrent winner's row if this insert lost the race.
pub async fn store_result(pool: &PgPool, params: StoreParams<'_>) -> Result<AnalysisRow, AppError> {
    let StoreParams {
        user_id,
        resume_hash,
        jd_hash,
        result,
        match_score,
        matched_keywords,
        missing_keywords,
    } = params;

    let inserted = sqlx::query(
        r#"
        INSERT INTO analysis_results
            (id, user_id, resume_hash, jd_hash, result,
             match_score, matched_keywords, missing_keywords)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, resume_hash, jd_hash) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(resume_hash)
    .bind(jd_hash)
    .bind(result)
    .bind(match_score)
    .bind(matched_keywords)
    .bind(missing_keywords)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        info!("Analysis insert lost the race for user {user_id}; serving the winning row");
    }

    find_cached(pool, user_id, resume_hash, jd_hash)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Analysis row vanished after insert")))
}

/// Denormalized history listing for a user, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<AnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, AnalysisRow>(
        "SELECT * FROM analysis_results WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
