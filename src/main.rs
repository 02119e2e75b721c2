//! Veracity - fact-checking chat client
//!
//! Serves a single conversation over HTTP. Every generated reply is
//! classified and, when it states a fact, verified against a
//! search-grounded backend before it is shown.

mod api;
mod config;
mod conversation;
mod llm;
mod pipeline;

use api::{create_router, AppState};
use config::Settings;
use llm::{
    ContentGenerator, GeminiService, HttpGenerationClient, LoggingService, TextGenerator,
    UnconfiguredContentGenerator, DEFAULT_MAX_NEW_TOKENS,
};
use pipeline::ResponsePipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veracity=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let settings = Settings::from_env()?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    // Backends
    let generator: Arc<dyn TextGenerator> = Arc::new(LoggingService::new(
        Arc::new(HttpGenerationClient::new(
            client.clone(),
            settings.generation_url.clone(),
            DEFAULT_MAX_NEW_TOKENS,
        )),
        "generation",
    ));

    let content_backend: Arc<dyn ContentGenerator> = match &settings.gemini_api_key {
        Some(key) => Arc::new(GeminiService::new(
            client,
            key.clone(),
            &settings.gemini_model,
            &settings.gemini_base_url,
        )),
        None => {
            tracing::warn!("No GEMINI_API_KEY configured. Fact-checking will be unavailable.");
            Arc::new(UnconfiguredContentGenerator)
        }
    };
    let content: Arc<dyn ContentGenerator> =
        Arc::new(LoggingService::new(content_backend, "gemini"));

    tracing::info!(
        generator = %generator.name(),
        generation_url = %settings.generation_url,
        content_model = %content.model_id(),
        "Backends configured"
    );

    // Create application state
    let pipeline = Arc::new(ResponsePipeline::new(generator, content, &settings.pipeline));
    let state = AppState::new(pipeline);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Veracity server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
