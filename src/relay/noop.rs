//! Relay used when no hardware is attached

use async_trait::async_trait;
use tracing::info;

use super::{RelayActuator, RelayError, RelayHealth};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRelay;

#[async_trait]
impl RelayActuator for NoopRelay {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn activate(&self, duration_ms: u64) -> Result<(), RelayError> {
        info!("Relay disabled: would activate for {}ms", duration_ms);
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), RelayError> {
        info!("Relay disabled: would deactivate");
        Ok(())
    }

    async fn health(&self) -> RelayHealth {
        RelayHealth::ok(self.name(), "no hardware configured")
    }
}
