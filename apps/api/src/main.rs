mod analysis;
mod billing;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod tiers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::provider::LlmAnalysisProvider;
use crate::billing::gateway::PaystackGateway;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::tiers::sweep::spawn_sweep_task;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fitgate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize analysis provider (LLM-backed)
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    let provider = Arc::new(LlmAnalysisProvider(llm));
    info!("Analysis provider initialized (model: {})", llm_client::MODEL);

    // Initialize payment gateway
    let payments = Arc::new(PaystackGateway::new(config.paystack_secret_key.clone()));
    info!("Payment gateway client initialized");

    // Background subscription expiry sweep
    spawn_sweep_task(pool.clone(), config.sweep_interval_secs);
    info!(
        "Subscription sweep scheduled every {}s",
        config.sweep_interval_secs
    );

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
        provider,
        payments,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
