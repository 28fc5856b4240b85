use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One cached analysis. Keyed by (user_id, resume_hash, jd_hash); rows are
/// written once and never updated — a repeat submission with identical text
/// is served from this row instead of re-invoking the provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_hash: String,
    pub jd_hash: String,
    /// Full structured provider result as returned to the client.
    pub result: Value,
    pub match_score: i32,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}
