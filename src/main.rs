mod agent;
mod config;
mod errors;
mod models;
mod routes;
mod service;

use tracing::{error, info};

use crate::agent::AiGateway;
use crate::config::AppConfig;
use crate::routes::{AppState, router};
use crate::service::dashboard::Dashboard;
use crate::service::image_studio::ImageStudio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_studio=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration (missing credential is fatal) ───────────────────────────
    let config = AppConfig::from_env().inspect_err(|e| error!("Startup aborted: {e}"))?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let gateway = AiGateway::from_config(&config).inspect_err(|e| error!("Startup aborted: {e}"))?;
    info!(
        "AI gateway ready (chat: {}, images: {}, sessions: {:?})",
        config.chat_model, config.image_model, config.session_scope
    );

    let state = AppState {
        dashboard: Dashboard::new(gateway.clone()),
        studio: ImageStudio::new(gateway),
    };
    let app = router(state);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
