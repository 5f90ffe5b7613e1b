//! Lingo Tutor - LLM-driven grammar tutoring service
//!
//! A Rust backend running one session state machine per learner: a
//! diagnostic quiz, a level assessment, then an adaptive exercise loop.

mod api;
mod config;
mod llm;
mod runtime;
mod state_machine;
mod tutor;

use api::{create_router, AppState};
use config::ServerConfig;
use llm::{build_service, LlmConfig};
use runtime::RuntimeManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor::{LlmTutorGateway, TutorGateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingo_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let server_config = ServerConfig::from_env();
    let llm_config = LlmConfig::from_env();

    if llm_config.has_credentials() {
        tracing::info!(model = %llm_config.model(), "LLM provider configured");
    } else {
        tracing::warn!("No LLM credentials configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }

    let gateway: Arc<dyn TutorGateway> =
        Arc::new(LlmTutorGateway::new(build_service(&llm_config)));

    // Create application state
    let state = AppState::new(
        gateway,
        server_config.next_exercise_delay,
        server_config.session_idle_ttl,
    );
    let runtime = Arc::clone(&state.runtime);
    RuntimeManager::spawn_idle_reaper(&runtime, server_config.idle_sweep_interval());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Lingo Tutor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
            runtime.end_all().await;
        })
        .await?;

    Ok(())
}
