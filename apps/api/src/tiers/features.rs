//! Static feature matrix: feature name → minimum tier rank.
//!
//! This used to live as a CASE expression inside a SQL function; it is kept
//! here as a plain lookup table so the gate is testable without a database.

use crate::tiers::Tier;

/// Minimum rank required per feature. Features absent from this table are
/// open to everyone (rank 0).
const FEATURE_MATRIX: &[(&str, Tier)] = &[
    ("job_match_analysis", Tier::Free),
    ("resume_upload", Tier::Free),
    ("internet_search", Tier::Pro),
    ("skills_gap_assessment", Tier::Pro),
    ("ats_optimization", Tier::Pro),
    ("analysis_history", Tier::Pro),
    ("interview_preparation", Tier::Enterprise),
    ("career_roadmap", Tier::Enterprise),
];

/// Minimum rank required to use `feature`. Unknown features require 0.
pub fn required_rank(feature: &str) -> i32 {
    FEATURE_MATRIX
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, tier)| tier.rank())
        .unwrap_or(0)
}

/// Pure gate decision: does a resolved tier grant access to `feature`?
/// Admin passes unconditionally.
pub fn tier_allows(tier: Tier, feature: &str) -> bool {
    if tier == Tier::Admin {
        return true;
    }
    tier.rank() >= required_rank(feature)
}

/// All features the given tier may use, in matrix order. Drives the
/// section filter on analysis requests.
pub fn allowed_features(tier: Tier) -> Vec<&'static str> {
    FEATURE_MATRIX
        .iter()
        .filter(|(name, _)| tier_allows(tier, name))
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_user_denied_internet_search() {
        assert!(!tier_allows(Tier::Free, "internet_search"));
    }

    #[test]
    fn test_pro_user_allowed_internet_search() {
        assert!(tier_allows(Tier::Pro, "internet_search"));
    }

    #[test]
    fn test_enterprise_covers_all_pro_features() {
        for (name, min) in FEATURE_MATRIX {
            if min.rank() <= Tier::Pro.rank() {
                assert!(tier_allows(Tier::Enterprise, name), "{name} denied");
            }
        }
    }

    #[test]
    fn test_enterprise_features_denied_to_pro() {
        assert!(!tier_allows(Tier::Pro, "interview_preparation"));
        assert!(!tier_allows(Tier::Pro, "career_roadmap"));
    }

    #[test]
    fn test_admin_passes_everything() {
        for (name, _) in FEATURE_MATRIX {
            assert!(tier_allows(Tier::Admin, name));
        }
        // Even a feature above every rank would pass for admin.
        assert!(tier_allows(Tier::Admin, "internet_search"));
    }

    #[test]
    fn test_unknown_feature_open_to_everyone() {
        assert_eq!(required_rank("does_not_exist"), 0);
        assert!(tier_allows(Tier::Free, "does_not_exist"));
    }

    #[test]
    fn test_job_match_analysis_is_free() {
        assert!(tier_allows(Tier::Free, "job_match_analysis"));
    }

    #[test]
    fn test_allowed_features_grow_with_rank() {
        let free = allowed_features(Tier::Free).len();
        let pro = allowed_features(Tier::Pro).len();
        let ent = allowed_features(Tier::Enterprise).len();
        assert!(free < pro && pro < ent);
        assert_eq!(allowed_features(Tier::Admin).len(), FEATURE_MATRIX.len());
    }
}
