//! Server initialization and run loop

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use careflow_core::{
    follow, AgentDirectory, BoardFeed, ChatTransport, HttpAgentDirectory, HttpChatTransport,
    LocalThreadProvider, OfflineTransport, RuntimeMultiplexer, StaticAgentDirectory,
};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::config::{AgentsConfig, AppConfig};
use super::loader::load_config;
use crate::api::{api_router, AppState};

/// Agent directory from configuration; the built-in list when no URL is set
pub fn build_directory(config: &AgentsConfig) -> Result<Arc<dyn AgentDirectory>> {
    match &config.directory_url {
        Some(url) => {
            let directory = HttpAgentDirectory::new(url.as_str(), config.request_timeout())
                .context("Failed to create agent directory client")?;
            Ok(Arc::new(directory))
        }
        None => Ok(Arc::new(StaticAgentDirectory::default())),
    }
}

fn build_transport(config: &AgentsConfig) -> Result<Arc<dyn ChatTransport>> {
    match &config.chat_url {
        Some(url) => {
            let transport = HttpChatTransport::new(
                url,
                config.request_timeout(),
                config.stream_idle_timeout(),
            )
                .context("Failed to create chat transport")?;
            info!(url = %url, "Chat backend configured");
            Ok(Arc::new(transport))
        }
        None => {
            warn!("No chat backend configured, chat turns will fail inline");
            Ok(Arc::new(OfflineTransport))
        }
    }
}

/// Build the shared state: board feed, multiplexer with a prewarmed active slot
async fn build_state(config: &AppConfig) -> Result<AppState> {
    let feed = BoardFeed::new(config.board.initial_board(), config.board.highlight_timer());
    let multiplexer = RuntimeMultiplexer::new(
        config.agents.multiplexer_config(),
        build_transport(&config.agents)?,
        Arc::new(LocalThreadProvider),
    );

    let directory = build_directory(&config.agents)?;
    multiplexer.refresh(directory.as_ref()).await;
    multiplexer
        .activate_current()
        .await
        .context("Failed to activate the default agent")?;

    let state = AppState {
        feed: Arc::new(Mutex::new(feed)),
        multiplexer: Arc::new(multiplexer),
        snapshot_limit: config.board.snapshot_limit,
    };
    state.refresh_instructions().await;
    Ok(state)
}

/// Feed the visible transcript into the board and keep the board snapshot in
/// the active slot's context.
fn spawn_board_pipeline(state: &AppState, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
    let changed = Arc::new(Notify::new());

    let notify = Arc::clone(&changed);
    let feeder = follow(
        Arc::clone(&state.feed),
        state.multiplexer.subscribe_visible(),
        move |_, report| {
            if report.applied() > 0 {
                notify.notify_one();
            }
        },
    );

    let instructions_state = state.clone();
    let instructions = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = changed.notified() => instructions_state.refresh_instructions().await,
            }
        }
    });

    vec![feeder, instructions]
}

/// Build the HTTP application
fn build_app(state: AppState) -> Router {
    api_router(state)
        .route("/", get(|| async { "Careflow" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
    token.cancel();
}

/// Run the server
pub async fn run() -> Result<()> {
    let config = load_config()?;
    let state = build_state(&config).await?;

    let shutdown = CancellationToken::new();
    let pipeline = spawn_board_pipeline(&state, shutdown.clone());
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    for handle in pipeline {
        handle.abort();
    }

    info!("Careflow shutdown complete");
    Ok(())
}
