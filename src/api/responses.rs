//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Settings, StateSnapshot};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response for start/reset endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub state: StateSnapshot,
}

impl ApiResponse {
    pub fn ok(state: StateSnapshot) -> Self {
        Self { ok: true, state }
    }
}

/// Response for the settings endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub ok: bool,
    pub settings: Settings,
}

impl SettingsResponse {
    pub fn ok(settings: Settings) -> Self {
        Self { ok: true, settings }
    }
}

/// Bare acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub observers: usize,
    /// Whether a ticker task is currently scheduled
    pub ticking: bool,
    pub relay: String,
}

impl HealthResponse {
    pub fn ok(uptime: String, observers: usize, ticking: bool, relay: &str) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: VERSION.to_string(),
            uptime,
            observers,
            ticking,
            relay: relay.to_string(),
        }
    }
}
