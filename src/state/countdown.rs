//! Authoritative countdown record and the snapshots derived from it

use serde::{Deserialize, Serialize};

/// The single process-wide countdown record.
///
/// `running` is never stored: it is re-derived from `end_time` and the
/// current time on every read, so it cannot disagree with the deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownRecord {
    duration_ms: u64,
    end_time: Option<i64>,
}

impl CountdownRecord {
    /// Create an idle record seeded with the default duration
    pub fn new(default_duration_ms: u64) -> Self {
        Self {
            duration_ms: default_duration_ms,
            end_time: None,
        }
    }

    /// Arm the countdown. `None` reuses the stored duration.
    pub fn start(&mut self, duration_ms: Option<u64>, now_ms: i64) -> StateSnapshot {
        let duration = duration_ms.unwrap_or(self.duration_ms);
        self.duration_ms = duration;
        self.end_time = Some(now_ms.saturating_add(clamp_to_i64(duration)));
        self.snapshot(now_ms)
    }

    /// Disarm the countdown, optionally replacing the stored duration
    pub fn reset(&mut self, duration_ms: Option<u64>, now_ms: i64) -> StateSnapshot {
        if let Some(duration) = duration_ms {
            self.duration_ms = duration;
        }
        self.end_time = None;
        self.snapshot(now_ms)
    }

    /// True while a deadline is set and still in the future
    pub fn is_running(&self, now_ms: i64) -> bool {
        matches!(self.end_time, Some(end) if end > now_ms)
    }

    /// Pure view of the record at `now_ms`
    pub fn snapshot(&self, now_ms: i64) -> StateSnapshot {
        let running = self.is_running(now_ms);
        let remaining_ms = match self.end_time {
            Some(end) if running => u64::try_from(end - now_ms).unwrap_or(0),
            _ => 0,
        };

        StateSnapshot {
            duration_ms: self.duration_ms,
            end_time: self.end_time,
            remaining_ms,
            running,
        }
    }
}

/// Immutable view of the countdown at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub duration_ms: u64,
    /// Absolute epoch milliseconds of the deadline
    pub end_time: Option<i64>,
    pub remaining_ms: u64,
    pub running: bool,
}

/// Normalize a loosely typed duration to whole non-negative milliseconds.
///
/// Negative values clamp to zero and fractions are floored. Non-finite
/// input yields `None`, which callers treat as "not provided".
pub fn normalize_duration(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    if value <= 0.0 {
        return Some(0);
    }
    // `as` saturates at u64::MAX for huge values
    Some(value.floor() as u64)
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
