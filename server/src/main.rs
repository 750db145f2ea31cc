mod config;
mod handlers;
mod middleware;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use poster_fusion_cli::ai::{CreativeService, GeminiCreative};
use poster_fusion_cli::config::GeminiConfig;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use routes::session::app;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server=debug,poster_fusion_cli=debug,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let gemini = GeminiConfig::from_env()?;
    debug!(?gemini, "creative service configured");

    let service: Arc<dyn CreativeService> = Arc::new(GeminiCreative::new(gemini)?);
    let state = AppState::new(service, config.max_sessions);

    // Sessions hold their images in memory; forget the ones nobody uses.
    let sweeper = state.clone();
    let ttl = chrono::Duration::minutes(config.session_ttl_minutes);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweeper.prune_idle(ttl);
            if removed > 0 {
                debug!(removed, remaining = sweeper.sessions.len(), "pruned idle sessions");
            }
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(config.client_url.parse::<HeaderValue>()?)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true);

    let app = app(state, config.max_upload_bytes).layer(cors);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "poster fusion server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
