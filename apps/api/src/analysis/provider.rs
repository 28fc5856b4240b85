//! Analysis provider — pluggable, trait-based boundary to the external LLM.
//!
//! `AppState` holds an `Arc<dyn AnalysisProvider>`; production wires in
//! `LlmAnalysisProvider`, tests substitute a mock. Nothing outside this
//! module knows how the result JSON is produced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::LlmClient;

// ────────────────────────────────────────────────────────────────────────────
// Result schema (the provider wire contract)
// ────────────────────────────────────────────────────────────────────────────

/// Binary keyword classification — there is no partial-match state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeywordStatus {
    Present,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordHit {
    pub keyword: String,
    pub status: KeywordStatus,
}

/// Premium per-section sub-report (skills gap, ATS, interview prep, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionReport {
    /// 0–10 per-section score.
    pub score: u32,
    pub summary: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Full structured output of one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub match_summary: String,
    /// The provider returns the score as a string of the form "72/100";
    /// the numeric part is extracted with `extract_score`.
    pub match_score: String,
    pub job_keywords_detected: Vec<KeywordHit>,
    pub gaps_and_suggestions: Vec<String>,
    /// Premium sections keyed by feature name, only for sections that were
    /// requested AND permitted by the user's tier.
    #[serde(default)]
    pub sections: std::collections::BTreeMap<String, SectionReport>,
}

impl AnalysisOutcome {
    /// Numeric 0–100 score parsed out of the "N/100"-style string.
    /// A malformed score string counts as a malformed provider response.
    pub fn score(&self) -> Result<i32, AppError> {
        extract_score(&self.match_score).ok_or_else(|| {
            AppError::Llm(format!("Unparseable match_score: {:?}", self.match_score))
        })
    }

    pub fn present_keywords(&self) -> Vec<String> {
        self.keywords_with(KeywordStatus::Present)
    }

    pub fn missing_keywords(&self) -> Vec<String> {
        self.keywords_with(KeywordStatus::Missing)
    }

    fn keywords_with(&self, status: KeywordStatus) -> Vec<String> {
        self.job_keywords_detected
            .iter()
            .filter(|k| k.status == status)
            .map(|k| k.keyword.clone())
            .collect()
    }
}

/// Pulls the leading integer out of score strings like "72/100", "72 / 100"
/// or plain "72", clamped to 0–100. Returns None when no digits lead.
pub fn extract_score(raw: &str) -> Option<i32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i32>().ok().map(|n| n.clamp(0, 100))
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The analysis provider boundary. Implement this to swap the backing
/// model (or to mock the provider in tests) without touching the engine,
/// handlers, or cache.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        jd_text: &str,
        sections: &[String],
    ) -> Result<AnalysisOutcome, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmAnalysisProvider — production implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmAnalysisProvider(pub LlmClient);

#[async_trait]
impl AnalysisProvider for LlmAnalysisProvider {
    async fn analyze(
        &self,
        resume_text: &str,
        jd_text: &str,
        sections: &[String],
    ) -> Result<AnalysisOutcome, AppError> {
        let prompt = ANALYSIS_PROMPT_TEMPLATE
            .replace("{resume_text}", resume_text)
            .replace("{jd_text}", jd_text)
            .replace("{sections}", &sections.join(", "));

        self.0
            .call_json::<AnalysisOutcome>(&prompt, ANALYSIS_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Analysis call failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_score_slash_form() {
        assert_eq!(extract_score("72/100"), Some(72));
    }

    #[test]
    fn test_extract_score_spaced_form() {
        assert_eq!(extract_score(" 85 / 100"), Some(85));
    }

    #[test]
    fn test_extract_score_bare_number() {
        assert_eq!(extract_score("90"), Some(90));
    }

    #[test]
    fn test_extract_score_clamps_overflow() {
        assert_eq!(extract_score("250/100"), Some(100));
    }

    #[test]
    fn test_extract_score_rejects_garbage() {
        assert_eq!(extract_score("excellent"), None);
        assert_eq!(extract_score(""), None);
        assert_eq!(extract_score("/100"), None);
    }

    #[test]
    fn test_outcome_deserializes_full_payload() {
        let json = r#"{
            "match_summary": "Good overall alignment with the role.",
            "match_score": "72/100",
            "job_keywords_detected": [
                {"keyword": "Rust", "status": "Present"},
                {"keyword": "Kubernetes", "status": "Missing"}
            ],
            "gaps_and_suggestions": ["Add container orchestration experience"],
            "sections": {
                "skills_gap_assessment": {
                    "score": 6,
                    "summary": "Some infra gaps",
                    "issues": ["No k8s"],
                    "suggestions": ["Mention Docker Compose work"]
                }
            }
        }"#;

        let outcome: AnalysisOutcome = serde_json::from_str(json).unwrap();
        assert_eq!(outcome.score().unwrap(), 72);
        assert_eq!(outcome.present_keywords(), vec!["Rust".to_string()]);
        assert_eq!(outcome.missing_keywords(), vec!["Kubernetes".to_string()]);
        assert_eq!(outcome.sections["skills_gap_assessment"].score, 6);
    }

    #[test]
    fn test_outcome_sections_default_empty() {
        // Free-tier responses carry no premium sections at all.
        let json = r#"{
            "match_summary": "ok",
            "match_score": "50/100",
            "job_keywords_detected": [],
            "gaps_and_suggestions": []
        }"#;
        let outcome: AnalysisOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.sections.is_empty());
    }

    #[test]
    fn test_malformed_score_is_llm_error() {
        let outcome = AnalysisOutcome {
            match_summary: String::new(),
            match_score: "great fit".to_string(),
            job_keywords_detected: vec![],
            gaps_and_suggestions: vec![],
            sections: Default::default(),
        };
        assert!(matches!(outcome.score(), Err(AppError::Llm(_))));
    }
}
