//! HTTP API module
//!
//! This module contains the request/response endpoints, the WebSocket
//! real-time channel and their response structures.

pub mod error;
pub mod handlers;
pub mod responses;
pub mod ws;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;
use ws::ws_handler;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(state_handler))
        .route("/api/start", post(start_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/settings", get(get_settings_handler).post(post_settings_handler))
        .route("/api/relay", get(relay_health_handler))
        .route("/api/relay/off", post(relay_off_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
