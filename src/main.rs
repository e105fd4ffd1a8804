//! Shared Countdown - one authoritative countdown broadcast to every viewer
//!
//! This is the main entry point for the shared-countdown server.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use shared_countdown::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    relay::{self, RelayDispatcher},
    state::{AppState, CountdownOptions},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("shared_countdown={},tower_http=info", config.log_level()))
        .init();

    info!("Starting shared-countdown server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, default={}ms, tick={:?}, relay={:?}",
        config.host,
        config.port,
        config.default_duration_ms,
        config.tick_period(),
        config.relay
    );

    // Pick the relay backend once; a failed backend degrades to no relay
    let relay_settings = config.relay_settings();
    let relay = RelayDispatcher::new(relay::build(&relay_settings).await, relay_settings.timeout);

    // Create application state
    let state = Arc::new(AppState::new(
        CountdownOptions::from(&config),
        Arc::new(SystemClock),
        relay,
    ));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /api/state      - Current countdown snapshot");
    info!("  POST /api/start      - Start the countdown");
    info!("  POST /api/reset      - Reset the countdown");
    info!("  GET  /api/settings   - Read settings");
    info!("  POST /api/settings   - Update settings");
    info!("  GET  /api/relay      - Relay backend health");
    info!("  POST /api/relay/off  - Switch the relay off");
    info!("  GET  /ws             - Real-time channel");
    info!("  GET  /health         - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.reset(None);
    state.relay.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
