//! Relay driven through the libgpiod command line tools

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{pin::PinWriter, RelayError};

const GPIOSET: &str = "gpioset";

#[derive(Debug, Clone)]
pub struct GpiosetPin {
    chip: String,
    pin: u32,
}

impl GpiosetPin {
    pub fn new(chip: impl Into<String>, pin: u32) -> Self {
        Self {
            chip: chip.into(),
            pin,
        }
    }

    /// Arguments passed to gpioset for the given level
    pub fn args(&self, high: bool) -> [String; 2] {
        [self.chip.clone(), format!("{}={}", self.pin, u8::from(high))]
    }
}

#[async_trait]
impl PinWriter for GpiosetPin {
    fn backend(&self) -> &'static str {
        "gpioset"
    }

    /// Check that gpioset is installed
    async fn prepare(&self) -> Result<(), RelayError> {
        Command::new(GPIOSET)
            .arg("--version")
            .output()
            .await
            .map_err(|e| RelayError::Command {
                program: GPIOSET.to_string(),
                detail: format!("not available: {}", e),
            })?;

        info!("gpioset is available, driving {} line {}", self.chip, self.pin);
        Ok(())
    }

    async fn write(&self, high: bool) -> Result<(), RelayError> {
        debug!("Running {} {:?}", GPIOSET, self.args(high));

        let output = Command::new(GPIOSET)
            .args(self.args(high))
            .output()
            .await
            .map_err(|e| RelayError::Command {
                program: GPIOSET.to_string(),
                detail: format!("failed to execute: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RelayError::Command {
                program: GPIOSET.to_string(),
                detail: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_encode_chip_line_and_level() {
        let pin = GpiosetPin::new("gpiochip4", 17);
        assert_eq!(pin.args(true), ["gpiochip4".to_string(), "17=1".to_string()]);
        assert_eq!(pin.args(false), ["gpiochip4".to_string(), "17=0".to_string()]);
    }
}
