use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::relay::routes::create_router;
use crate::relay::state::RelayState;

/// Start the relay server and run until Ctrl-C
pub async fn start_relay_server(config: &AppConfig) -> Result<()> {
    let state = RelayState::from_config(config)?;

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;
    info!(
        downstream = %state.relay.endpoint(),
        "relay listening on http://{}",
        addr
    );

    serve(listener, state, shutdown_signal()).await
}

/// Serve the relay on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: RelayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler; relay will run until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
