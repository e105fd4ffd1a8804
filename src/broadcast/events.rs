//! Messages exchanged with observers on the real-time channel

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{normalize_duration, StateSnapshot};

/// Server to observer event.
///
/// Serialized as `{"event": "<name>", "state": {..}}`; `done` carries no state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "state", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Replay of the current snapshot to a newly connected observer only
    State(StateSnapshot),
    Start(StateSnapshot),
    Tick(StateSnapshot),
    Reset(StateSnapshot),
    Done,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::State(_) => "state",
            ServerEvent::Start(_) => "start",
            ServerEvent::Tick(_) => "tick",
            ServerEvent::Reset(_) => "reset",
            ServerEvent::Done => "done",
        }
    }
}

/// Observer to server command, mirroring the request/response surface
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientCommand {
    Start(DurationRequest),
    Reset(DurationRequest),
}

/// Optional duration carried by start/reset requests.
///
/// Fields are kept as raw JSON so that strings, nulls and other junk
/// degrade to "not provided" instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationRequest {
    #[serde(default)]
    pub duration_ms: Option<Value>,
    #[serde(default)]
    pub duration_seconds: Option<Value>,
}

impl DurationRequest {
    /// Parse a request body leniently; an empty or malformed body means no duration
    pub fn from_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Resolve to whole milliseconds. `durationMs` wins over `durationSeconds`.
    pub fn resolve(&self) -> Option<u64> {
        let from_ms = self
            .duration_ms
            .as_ref()
            .and_then(Value::as_f64)
            .and_then(normalize_duration);

        from_ms.or_else(|| {
            self.duration_seconds
                .as_ref()
                .and_then(Value::as_f64)
                .and_then(|secs| normalize_duration(secs * 1000.0))
        })
    }
}
