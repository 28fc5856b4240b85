use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::provider::AnalysisProvider;
use crate::billing::gateway::PaymentGateway;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Loaded env configuration. Only read at startup today.
    #[allow(dead_code)]
    pub config: Config,
    /// Pluggable analysis backend. Production: LlmAnalysisProvider.
    pub provider: Arc<dyn AnalysisProvider>,
    /// Pluggable payment gateway. Production: PaystackGateway.
    pub payments: Arc<dyn PaymentGateway>,
}
