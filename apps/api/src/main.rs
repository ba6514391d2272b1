mod config;
mod db;
mod errors;
mod generation;
mod keywords;
mod llm_client;
mod models;
mod profiles;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::pipeline::ResumePipeline;
use crate::keywords::extractor::KeywordExtractor;
use crate::llm_client::LlmClient;
use crate::profiles::repository::PgProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

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

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;
    let profile_store = PgProfileStore::new(db.clone());

    // Initialize generation backend client
    let llm = LlmClient::new(
        config.llm_base_url.clone(),
        config.llm_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    );
    info!(
        "LLM client initialized (model: {}, base: {})",
        config.llm_model, config.llm_base_url
    );

    let extractor = KeywordExtractor::new(config.keyword_limit);
    let pipeline = ResumePipeline::new(
        Arc::new(llm),
        extractor.clone(),
        config.prompt_keyword_count,
    );

    let state = AppState {
        db,
        config: config.clone(),
        pipeline,
        extractor,
        profiles: Arc::new(profile_store.clone()),
        profile_store,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
