//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{body::Bytes, extract::State, response::Json};
use tracing::{info, warn};

use crate::{
    broadcast::DurationRequest,
    relay::RelayHealth,
    state::{AppState, SettingsUpdate, StateSnapshot},
};
use super::{
    error::ApiError,
    responses::{AckResponse, ApiResponse, HealthResponse, SettingsResponse},
};

/// Handle GET /api/state - Return the current snapshot
pub async fn state_handler(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    Json(state.snapshot())
}

/// Handle POST /api/start - Start the countdown
///
/// The body is optional; anything unparseable means "reuse the stored duration".
pub async fn start_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Json<ApiResponse> {
    let request = DurationRequest::from_body(&body);
    let snapshot = state.start(request.resolve());
    info!("Start endpoint called - {}ms", snapshot.duration_ms);
    Json(ApiResponse::ok(snapshot))
}

/// Handle POST /api/reset - Reset the countdown
pub async fn reset_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Json<ApiResponse> {
    let request = DurationRequest::from_body(&body);
    let snapshot = state.reset(request.resolve());
    info!("Reset endpoint called");
    Json(ApiResponse::ok(snapshot))
}

/// Handle GET /api/settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse::ok(state.settings()))
}

/// Handle POST /api/settings - Merge a partial settings update
pub async fn post_settings_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SettingsResponse>, ApiError> {
    let update: SettingsUpdate = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected settings payload: {}", e);
        ApiError::BadRequest(e.to_string())
    })?;

    let settings = state.update_settings(&update).map_err(ApiError::BadRequest)?;
    Ok(Json(SettingsResponse::ok(settings)))
}

/// Handle GET /api/relay - Report the active relay backend
pub async fn relay_health_handler(State(state): State<Arc<AppState>>) -> Json<RelayHealth> {
    Json(state.relay_health().await)
}

/// Handle POST /api/relay/off - Switch the relay off without touching the countdown
pub async fn relay_off_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    info!("Relay off endpoint called");
    state.relay.deactivate();
    Json(AckResponse { ok: true })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.get_uptime(),
        state.hub.observers(),
        state.ticker_active(),
        state.relay.name(),
    ))
}
