//! In-memory relay that records every call.
//!
//! Used by the test suites to observe how often the core drives the relay,
//! and to simulate failing or hanging hardware.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

use async_trait::async_trait;

use super::{RelayActuator, RelayError, RelayHealth};

/// One recorded relay call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    Activate(u64),
    Deactivate,
}

#[derive(Debug, Default)]
pub struct RecordingRelay {
    calls: Mutex<Vec<RelayCall>>,
    activations: AtomicUsize,
    on: AtomicBool,
    fail: bool,
    delay: Option<Duration>,
    activate_delay: Option<Duration>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call records itself and then fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call records itself and then sleeps before returning
    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Only `activate` is slow; the relay counts as on once it returns
    pub fn slow_activate(delay: Duration) -> Self {
        Self {
            activate_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Level left behind by the last call that ran to completion
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    async fn finish(&self, call: RelayCall) -> Result<(), RelayError> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        let delay = match call {
            RelayCall::Activate(_) => self.activate_delay.or(self.delay),
            RelayCall::Deactivate => self.delay,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RelayError::Unavailable("simulated failure".to_string()));
        }
        self.on.store(matches!(call, RelayCall::Activate(_)), Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RelayActuator for RecordingRelay {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn activate(&self, duration_ms: u64) -> Result<(), RelayError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.finish(RelayCall::Activate(duration_ms)).await
    }

    async fn deactivate(&self) -> Result<(), RelayError> {
        self.finish(RelayCall::Deactivate).await
    }

    async fn health(&self) -> RelayHealth {
        if self.fail {
            RelayHealth::failed(self.name(), "simulated failure")
        } else {
            RelayHealth::ok(self.name(), format!("{} calls", self.calls().len()))
        }
    }
}
