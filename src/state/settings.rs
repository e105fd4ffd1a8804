//! Runtime-adjustable settings (kept in memory only)

use serde::{Deserialize, Serialize};

/// Presets offered to the control panel when none are configured
pub const DEFAULT_PRESETS: [u64; 5] = [10, 20, 30, 45, 60];
pub const MAX_PRESETS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Default countdown length offered to observers, in seconds.
    /// Fractional so a millisecond default survives a GET/POST round trip.
    pub default_duration_seconds: f64,
    /// Quick-pick durations in seconds
    pub presets: Vec<u64>,
    /// How long the relay stays on after completion (0 keeps it on)
    pub relay_duration_ms: u64,
}

impl Settings {
    pub fn new(default_duration_ms: u64, relay_duration_ms: u64) -> Self {
        Self {
            default_duration_seconds: default_duration_ms as f64 / 1000.0,
            presets: DEFAULT_PRESETS.to_vec(),
            relay_duration_ms,
        }
    }

    pub fn default_duration_ms(&self) -> u64 {
        (self.default_duration_seconds * 1000.0).round() as u64
    }
}

/// Partial update posted by a control panel; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub default_duration_seconds: Option<f64>,
    pub presets: Option<Vec<f64>>,
    pub relay_duration_ms: Option<f64>,
}

impl SettingsUpdate {
    /// Merge onto `current`, rejecting values that cannot be normalized
    pub fn apply(&self, current: &Settings) -> Result<Settings, String> {
        let mut next = current.clone();

        if let Some(secs) = self.default_duration_seconds {
            if !secs.is_finite() || secs < 0.0 {
                return Err("defaultDurationSeconds must be a non-negative number".to_string());
            }
            next.default_duration_seconds = (secs * 1000.0).round() / 1000.0;
        }
        if let Some(presets) = &self.presets {
            if presets.len() > MAX_PRESETS {
                return Err(format!("at most {} presets are allowed", MAX_PRESETS));
            }
            next.presets = presets
                .iter()
                .map(|p| whole("presets", *p))
                .collect::<Result<_, _>>()?;
        }
        if let Some(ms) = self.relay_duration_ms {
            next.relay_duration_ms = whole("relayDurationMs", ms)?;
        }
        Ok(next)
    }
}

fn whole(field: &str, value: f64) -> Result<u64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative number", field));
    }
    Ok(value.floor() as u64)
}
