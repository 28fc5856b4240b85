pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::billing::handlers as billing;
use crate::state::AppState;
use crate::tiers::handlers as tiers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis", post(analysis::handle_analyze))
        .route("/api/v1/analysis/history", get(analysis::handle_history))
        // Tier / feature-gate API
        .route("/api/v1/users/:id/tier", get(tiers::handle_get_tier))
        .route(
            "/api/v1/users/:id/features/:feature",
            get(tiers::handle_feature_access),
        )
        // Billing API
        .route("/api/v1/plans", get(billing::handle_list_plans))
        .route(
            "/api/v1/users/:id/subscription",
            get(billing::handle_get_subscription),
        )
        .route(
            "/api/v1/payments/initialize",
            post(billing::handle_initialize_payment),
        )
        .route(
            "/api/v1/payments/verify/:reference",
            get(billing::handle_verify_payment),
        )
        .with_state(state)
}
