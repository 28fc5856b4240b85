//! Tiered feature access — the application-side replacement for the old
//! `get_user_tier` / `user_has_feature_access` SQL functions.
//!
//! A tier is a named subscription level with a numeric rank. Ranks are
//! totally ordered; a feature is available to every tier at or above its
//! minimum rank. Admin sits above every rank unconditionally.

pub mod features;
pub mod handlers;
pub mod resolution;
pub mod sweep;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
    Admin,
}

impl Tier {
    /// Numeric rank used for feature gating. Matches the `rank` column of
    /// `subscription_plans`.
    pub fn rank(self) -> i32 {
        match self {
            Tier::Free => 0,
            Tier::Pro => 1,
            Tier::Enterprise => 2,
            Tier::Admin => 3,
        }
    }

    /// Parses the tier/role strings stored in `users.role` and
    /// `subscription_plans.tier`. Unknown strings resolve to `Free` — a
    /// corrupt role must never unlock paid features.
    pub fn parse(s: &str) -> Tier {
        match s {
            "pro" => Tier::Pro,
            "enterprise" => Tier::Enterprise,
            "admin" => Tier::Admin,
            _ => Tier::Free,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
            Tier::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_are_strictly_ordered() {
        assert!(Tier::Free.rank() < Tier::Pro.rank());
        assert!(Tier::Pro.rank() < Tier::Enterprise.rank());
        assert!(Tier::Enterprise.rank() < Tier::Admin.rank());
    }

    #[test]
    fn test_parse_round_trips_known_tiers() {
        for tier in [Tier::Free, Tier::Pro, Tier::Enterprise, Tier::Admin] {
            assert_eq!(Tier::parse(tier.as_str()), tier);
        }
    }

    #[test]
    fn test_unknown_role_string_is_free() {
        assert_eq!(Tier::parse("platinum"), Tier::Free);
        assert_eq!(Tier::parse(""), Tier::Free);
    }

    #[test]
    fn test_default_is_free() {
        assert_eq!(Tier::default(), Tier::Free);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Tier::Enterprise).unwrap();
        assert_eq!(json, r#""enterprise""#);
        let tier: Tier = serde_json::from_str(r#""pro""#).unwrap();
        assert_eq!(tier, Tier::Pro);
    }
}
