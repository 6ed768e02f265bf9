//! quizsmith web server
//!
//! Run with: cargo run -p quizsmith-web --bin quizsmith

use anyhow::Context;
use quizsmith_config::Config;
use quizsmith_service::QuizService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quizsmith=info,tower_http=info")),
        )
        .init();

    let config = Config::load().context("loading configuration")?;
    info!(?config, "Configuration loaded");

    let service = QuizService::from_config(&config).await.context("building quiz service")?;
    let app = quizsmith_web::router::build_router(quizsmith_web::state::AppState::new(service));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
