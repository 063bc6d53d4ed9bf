use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use live_scribe::{create_router, AppState, Config, NatsEngine, SessionManager};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "live-scribe", about = "Live audio transcription session service")]
struct Args {
    /// Path to the configuration file (extension optional)
    #[arg(long, default_value = "config/live-scribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Audio: {}Hz, {}ms chunks, {}ms overlap, gate {}",
        cfg.audio.sample_rate,
        cfg.audio.chunk_ms,
        cfg.audio.overlap_ms,
        if cfg.audio.gate.enabled { "on" } else { "off" }
    );

    let engine = NatsEngine::connect(&cfg.engine.nats_url, cfg.engine.subject.clone())
        .await
        .context("Failed to connect to the recognition engine")?;

    let manager = SessionManager::new(cfg.clone(), Arc::new(engine));
    manager.start_sweep();

    let state = AppState::new(
        Arc::clone(&manager),
        Duration::from_secs(cfg.service.http.keep_alive_secs.max(1)),
    );
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal(manager: Arc<SessionManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, draining sessions");
    manager.shutdown().await;
}
