//! job-chat-gateway – entry point.
//!
//! Startup order:
//! 1. Resolve the config path and load the YAML config.
//! 2. Initialise tracing (JSON or pretty, per `logging.format`).
//! 3. Build the collaborators and the router.
//! 4. Serve until Ctrl-C or SIGTERM, then shut down gracefully.

use anyhow::Context;
use job_chat_gateway::config::{resolve_config_path, GatewayConfig, LogFormat};
use job_chat_gateway::server::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let path = resolve_config_path(std::env::args().skip(1), std::env::var("GATEWAY_CONFIG").ok());
    let cfg = GatewayConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.logging.level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: logging.level='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.logging.level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    match cfg.logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        city = %cfg.city.name,
        model = %cfg.llm.model,
        "job-chat-gateway starting"
    );

    // ── 3. State and router ────────────────────────────────────────────────────
    let addr: SocketAddr = cfg
        .server
        .bind_address()
        .parse()
        .context("invalid server.host / server.port")?;
    let state = Arc::new(AppState::from_config(cfg)?);
    let app = server::router(state);

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");
    info!("OpenAI-compatible endpoint: POST http://{}{}", addr, server::CHAT_COMPLETIONS_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("job-chat-gateway stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
