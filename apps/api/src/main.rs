mod config;
mod decode;
mod errors;
mod extraction;
mod llm_client;
mod pipeline;
mod report;
mod routes;
mod scoring;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{CompletionService, LlmClient};
use crate::pipeline::MatchPipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Resolve the completion service once; the pipeline never consults the
    // environment again. Without a key, extraction and narrative synthesis
    // run on their deterministic fallbacks only.
    let llm: Option<Arc<dyn CompletionService>> = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; running with deterministic extraction only");
            None
        }
    };

    let pipeline = Arc::new(MatchPipeline::new(llm));

    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
