use std::{net::SocketAddr, sync::Arc};

use {
    axum::{Router, routing::get},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use {
    courier_channels::{ChannelMonitor, ErrorKind},
    courier_config::ServerConfig,
};

use crate::{health, routes};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<dyn ChannelMonitor>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(monitor: Arc<dyn ChannelMonitor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/telegram", routes::telegram_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { monitor })
}

/// Serve the gateway until ctrl-c, then stop the monitor if it is active.
pub async fn start_gateway(
    config: &ServerConfig,
    monitor: Arc<dyn ChannelMonitor>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let app = build_gateway_app(Arc::clone(&monitor));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match monitor.stop().await {
        Ok(()) => info!("telegram client stopped on shutdown"),
        Err(e) if e.kind() == ErrorKind::NotRunning => {},
        Err(e) => warn!(error = %e, "failed to stop telegram client on shutdown"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
