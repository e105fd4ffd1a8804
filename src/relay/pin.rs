//! Shared on/off/auto-off logic for backends that drive a pin level directly

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RelayActuator, RelayError, RelayHealth};

/// Raw access to one output pin
#[async_trait]
pub trait PinWriter: Send + Sync + 'static {
    /// Backend label used in logs and health reports
    fn backend(&self) -> &'static str;

    /// Claim the pin and configure it as an output
    async fn prepare(&self) -> Result<(), RelayError>;

    /// Drive the physical level (true = high)
    async fn write(&self, high: bool) -> Result<(), RelayError>;

    /// Release the pin
    async fn release(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

/// Relay on top of a [`PinWriter`], owning the auto-off timer
pub struct PinRelay<W: PinWriter> {
    writer: Arc<W>,
    active_high: bool,
    auto_off: Mutex<Option<JoinHandle<()>>>,
}

impl<W: PinWriter> PinRelay<W> {
    pub fn new(writer: W, active_high: bool) -> Self {
        Self {
            writer: Arc::new(writer),
            active_high,
            auto_off: Mutex::new(None),
        }
    }

    /// Prepare the pin and leave the relay off
    pub async fn init(&self) -> Result<(), RelayError> {
        self.writer.prepare().await?;
        self.set(false).await
    }

    fn level(&self, on: bool) -> bool {
        if self.active_high { on } else { !on }
    }

    async fn set(&self, on: bool) -> Result<(), RelayError> {
        self.writer.write(self.level(on)).await?;
        debug!("{} relay {}", self.writer.backend(), if on { "ON" } else { "OFF" });
        Ok(())
    }

    fn cancel_auto_off(&self) {
        let handle = self
            .auto_off
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[async_trait]
impl<W: PinWriter> RelayActuator for PinRelay<W> {
    fn name(&self) -> &'static str {
        self.writer.backend()
    }

    async fn activate(&self, duration_ms: u64) -> Result<(), RelayError> {
        self.cancel_auto_off();
        self.set(true).await?;

        if duration_ms > 0 {
            let writer = Arc::clone(&self.writer);
            let off_level = self.level(false);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                match writer.write(off_level).await {
                    Ok(()) => info!("{} relay auto-off after {}ms", writer.backend(), duration_ms),
                    Err(e) => warn!("{} relay auto-off failed: {}", writer.backend(), e),
                }
            });
            let previous = self
                .auto_off
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .replace(handle);
            if let Some(previous) = previous {
                previous.abort();
            }
        }
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), RelayError> {
        self.cancel_auto_off();
        self.set(false).await
    }

    async fn health(&self) -> RelayHealth {
        RelayHealth::ok(self.writer.backend(), format!("active_high={}", self.active_high))
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        self.deactivate().await?;
        self.writer.release().await
    }
}
