//! Relay driven through the kernel's /sys/class/gpio pin files

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::{fs, time::sleep};
use tracing::{debug, info, warn};

use super::{pin::PinWriter, RelayError};

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Polls for the pin directory to appear after export
const EXPORT_RETRIES: u32 = 10;
const EXPORT_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct SysfsPin {
    root: PathBuf,
    pin: u32,
}

impl SysfsPin {
    pub fn new(pin: u32) -> Self {
        Self::with_root(SYSFS_GPIO_ROOT, pin)
    }

    pub fn with_root(root: impl Into<PathBuf>, pin: u32) -> Self {
        Self {
            root: root.into(),
            pin,
        }
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    async fn write_file(path: &Path, contents: &str) -> Result<(), RelayError> {
        fs::write(path, contents)
            .await
            .map_err(|e| RelayError::io(path.display().to_string(), e))
    }
}

/// Map a BCM pin to the global sysfs number using the first large gpiochip's base.
///
/// Falls back to the BCM number when no chip can be read.
pub async fn resolve_sysfs_pin(root: &Path, bcm_pin: u32) -> u32 {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", root.display(), e);
            return bcm_pin;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("gpiochip") {
            continue;
        }
        let chip = entry.path();
        let base = read_number(&chip.join("base")).await;
        let ngpio = read_number(&chip.join("ngpio")).await;
        if let (Some(base), Some(ngpio)) = (base, ngpio) {
            if ngpio > 20 {
                let pin = base + bcm_pin;
                info!("BCM pin {} maps to sysfs pin {} (chip base {})", bcm_pin, pin, base);
                return pin;
            }
        }
    }
    bcm_pin
}

async fn read_number(path: &Path) -> Option<u32> {
    fs::read_to_string(path).await.ok()?.trim().parse().ok()
}

#[async_trait]
impl PinWriter for SysfsPin {
    fn backend(&self) -> &'static str {
        "sysfs"
    }

    async fn prepare(&self) -> Result<(), RelayError> {
        let dir = self.pin_dir();
        if fs::metadata(&dir).await.is_err() {
            Self::write_file(&self.root.join("export"), &self.pin.to_string()).await?;

            let mut retries = EXPORT_RETRIES;
            while retries > 0 && fs::metadata(&dir).await.is_err() {
                sleep(EXPORT_POLL).await;
                retries -= 1;
            }
            if fs::metadata(&dir).await.is_err() {
                return Err(RelayError::Unavailable(format!(
                    "{} not available after export",
                    dir.display()
                )));
            }
        }

        Self::write_file(&dir.join("direction"), "out").await?;
        info!("GPIO pin {} configured as output via sysfs", self.pin);
        Ok(())
    }

    async fn write(&self, high: bool) -> Result<(), RelayError> {
        Self::write_file(&self.pin_dir().join("value"), if high { "1" } else { "0" }).await
    }

    async fn release(&self) -> Result<(), RelayError> {
        if let Err(e) = Self::write_file(&self.root.join("unexport"), &self.pin.to_string()).await {
            warn!("Failed to unexport GPIO pin {}: {}", self.pin, e);
            return Err(e);
        }
        info!("GPIO pin {} unexported", self.pin);
        Ok(())
    }
}
