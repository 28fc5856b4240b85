use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Seeded reference data; read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub tier: String,
    pub rank: i32,
    pub price_cents: i64,
    pub currency: String,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// pending | active | inactive | cancelled | expired
    pub status: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub gateway_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A subscription joined with its plan's tier and rank, as fetched by the
/// tier-resolution query. Rank rides along so the tie-break needs no second
/// round trip.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSubscription {
    pub tier: String,
    pub rank: i32,
    pub ends_at: Option<DateTime<Utc>>,
}
