mod analysis;
mod api;
mod config;
mod embedding;

use crate::analysis::{EmbeddingKeyphraseExtractor, ReviewAnalyzer, VaderScorer};
use crate::api::AppState;
use crate::config::AppConfig;
use crate::embedding::EmbeddingService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level()?)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 Starting Review Analysis API Server");
    info!("📋 Configuration loaded");
    info!("   - Keyphrase model: {}", config.keywords.model_name);
    info!("   - Server: {}", config.bind_addr());

    // Initialize sentiment lexicon
    info!("📖 Loading sentiment lexicon...");
    let scorer = Arc::new(VaderScorer::new());
    info!("✅ Sentiment lexicon ready");

    // Initialize keyphrase model
    info!("🧠 Initializing keyphrase embedding model...");
    let embedding_service = EmbeddingService::new(&config.keywords)?;
    info!("✅ Embedding model ready (dim: {})", embedding_service.dimension());
    let extractor = Arc::new(EmbeddingKeyphraseExtractor::new(embedding_service));

    // ONNX runs on the CPU execution provider; no accelerator cache to clear
    info!("🖥️  No accelerator configured, running on CPU");

    let state = AppState {
        analyzer: Arc::new(ReviewAnalyzer::new(scorer, extractor)),
    };

    let app = api::build_router(state);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📡 Available endpoints:");
    info!("   POST /analyze          - Sentiment and keyphrases for a review");
    info!("");
    info!("✨ Server is ready to accept requests!");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
