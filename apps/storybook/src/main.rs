mod assets;
mod config;
mod document;
mod errors;
mod layout;
mod llm_client;
mod pipeline;
mod routes;
mod state;
mod story;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::layout::{default_candidates, resolve_font, CardCompositor};
use crate::llm_client::LlmClient;
use crate::pipeline::guard::RunSlot;
use crate::pipeline::status::StatusChannel;
use crate::routes::build_router;
use crate::state::AppState;
use crate::story::{JsonHistoryStore, LlmConceptGenerator, LlmQualityGate};

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

    info!("Starting Storybook v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the generation client (text and image share one HTTP client)
    let llm = Arc::new(LlmClient::new(
        config.google_api_key.clone(),
        config.text_model.clone(),
        config.image_model.clone(),
    )?);
    info!(
        "LLM client initialized (text: {}, image: {})",
        llm.text_model(),
        llm.image_model()
    );

    // Resolve the card font once; scanning system fonts is slow
    let font_paths = config.font_paths.clone();
    let font = tokio::task::spawn_blocking(move || resolve_font(&default_candidates(&font_paths))).await?;
    info!("Card font: {font:?}");

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let state = AppState {
        concepts: Arc::new(LlmConceptGenerator::new(llm.clone(), config.page_count)),
        gate: Arc::new(LlmQualityGate::new(llm.clone())),
        images: llm,
        history: Arc::new(JsonHistoryStore::new(config.history_path.clone())),
        compositor: Arc::new(CardCompositor::new(font)),
        status: StatusChannel::new(),
        run_slot: RunSlot::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
