//! HTTP facade exposing the streaming engine.

mod router;
mod state;

pub(crate) use state::ServeState;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use relay_cdp_adapter::{CdpFactory, SessionManager};

use crate::config::RelayConfig;

/// Run the facade until a shutdown signal arrives, then force-release the
/// shared browser session before returning.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let factory = CdpFactory::new(config.driver_config());
    let sessions = Arc::new(SessionManager::new(factory));
    let state = ServeState::new(sessions.clone(), Arc::new(config.clone()));
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown signal received, closing browser session");
    sessions.force_reset().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
