use std::sync::Arc;

use anyhow::Context;
use mailsight::analysis::{AnalysisClient, AnalysisConfig};
use mailsight::config::ServerConfig;
use mailsight::routes::{self, AppState};
use mailsight::score::RandomScoring;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env();
    let analysis = AnalysisConfig::from_env().map(|cfg| Arc::new(AnalysisClient::new(cfg)));

    eprintln!("📬 Mailsight v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}", config.port);
    eprintln!("   Origins: {}", config.allowed_origins.join(", "));
    eprintln!(
        "   Analysis: {}",
        if analysis.is_some() {
            "enabled"
        } else {
            "disabled (set ANALYSIS_API_KEY to enable)"
        }
    );

    let state = AppState {
        scoring: Arc::new(RandomScoring),
        analysis,
        imap_timeout: config.imap_timeout,
    };
    let app = routes::app(state, &config)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
