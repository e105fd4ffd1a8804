//! Relay actuator module
//!
//! The countdown core only ever sees [`RelayDispatcher`], which wraps one
//! [`RelayActuator`] picked at startup by [`build`]. Calls run in order on
//! one worker task under a timeout, and failures are logged and dropped so
//! the countdown never depends on hardware being present.

pub mod error;
pub mod gpioset;
pub mod http;
pub mod noop;
pub mod pin;
pub mod recording;
pub mod sysfs;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::config::RelayBackend;

pub use error::RelayError;
pub use gpioset::GpiosetPin;
pub use http::HttpRelay;
pub use noop::NoopRelay;
pub use pin::{PinRelay, PinWriter};
pub use recording::{RecordingRelay, RelayCall};
pub use sysfs::SysfsPin;

/// Hardware/service boundary that performs the completion side effect
#[async_trait]
pub trait RelayActuator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Switch on; switch off again after `duration_ms` unless it is 0
    async fn activate(&self, duration_ms: u64) -> Result<(), RelayError>;

    /// Switch off immediately. Idempotent.
    async fn deactivate(&self) -> Result<(), RelayError>;

    async fn health(&self) -> RelayHealth {
        RelayHealth::ok(self.name(), "")
    }

    /// Leave the hardware off and release it
    async fn shutdown(&self) -> Result<(), RelayError> {
        self.deactivate().await
    }
}

/// Health report of the active backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayHealth {
    pub backend: String,
    pub ok: bool,
    pub detail: String,
}

impl RelayHealth {
    pub fn ok(backend: &str, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failed(backend: &str, detail: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Options consumed by [`build`]
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub backend: RelayBackend,
    pub pin: u32,
    pub active_high: bool,
    pub url: String,
    pub chip: String,
    pub timeout: Duration,
}

/// Construct the configured backend once.
///
/// A backend that fails to initialize is replaced by [`NoopRelay`]; the
/// server keeps running without the physical side effect.
pub async fn build(settings: &RelaySettings) -> Arc<dyn RelayActuator> {
    let result: Result<Arc<dyn RelayActuator>, RelayError> = match settings.backend {
        RelayBackend::None => Ok(Arc::new(NoopRelay)),
        RelayBackend::Sysfs => {
            let root = Path::new(sysfs::SYSFS_GPIO_ROOT);
            let pin = sysfs::resolve_sysfs_pin(root, settings.pin).await;
            let relay = PinRelay::new(SysfsPin::new(pin), settings.active_high);
            relay.init().await.map(|()| Arc::new(relay) as Arc<dyn RelayActuator>)
        }
        RelayBackend::Gpioset => {
            let relay = PinRelay::new(GpiosetPin::new(&settings.chip, settings.pin), settings.active_high);
            relay.init().await.map(|()| Arc::new(relay) as Arc<dyn RelayActuator>)
        }
        RelayBackend::Http => {
            HttpRelay::new(&settings.url, settings.timeout).map(|r| Arc::new(r) as Arc<dyn RelayActuator>)
        }
    };

    match result {
        Ok(relay) => {
            info!(
                "Relay backend '{}' ready (pin={}, active_high={})",
                relay.name(),
                settings.pin,
                settings.active_high
            );
            relay
        }
        Err(e) => {
            warn!("Relay backend {:?} failed to initialize: {}", settings.backend, e);
            warn!("Continuing without relay; completion will only be broadcast");
            Arc::new(NoopRelay)
        }
    }
}

/// Calls queued for the relay worker
enum RelayCommand {
    Activate(u64),
    Deactivate,
    Shutdown(oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget front for the active relay.
///
/// Calls are queued to a single worker and reach the hardware in the order
/// they were made. A queued call supersedes an `activate` still in flight.
#[derive(Clone)]
pub struct RelayDispatcher {
    relay: Arc<dyn RelayActuator>,
    timeout: Duration,
    tx: mpsc::UnboundedSender<RelayCommand>,
}

impl std::fmt::Debug for RelayDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDispatcher")
            .field("relay", &self.relay.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RelayDispatcher {
    /// Must be called inside a tokio runtime; spawns the worker
    pub fn new(relay: Arc<dyn RelayActuator>, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(relay_worker(Arc::clone(&relay), timeout, rx));
        Self { relay, timeout, tx }
    }

    pub fn name(&self) -> &'static str {
        self.relay.name()
    }

    /// Queue an activation
    pub fn activate(&self, duration_ms: u64) {
        self.enqueue(RelayCommand::Activate(duration_ms));
    }

    /// Queue a switch-off; cancels an activation that has not finished yet
    pub fn deactivate(&self) {
        self.enqueue(RelayCommand::Deactivate);
    }

    /// Wait until every call queued so far has been handled
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(RelayCommand::Flush(done));
        let _ = wait.await;
    }

    pub async fn health(&self) -> RelayHealth {
        match timeout(self.timeout, self.relay.health()).await {
            Ok(health) => health,
            Err(_) => RelayHealth::failed(self.relay.name(), RelayError::Timeout(self.timeout).to_string()),
        }
    }

    /// Turn the relay off and release it, after the calls already queued
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        self.enqueue(RelayCommand::Shutdown(done));
        let _ = wait.await;
    }

    fn enqueue(&self, command: RelayCommand) {
        if self.tx.send(command).is_err() {
            warn!("Relay worker is gone; dropping relay call");
        }
    }
}

async fn relay_worker(
    relay: Arc<dyn RelayActuator>,
    limit: Duration,
    mut rx: mpsc::UnboundedReceiver<RelayCommand>,
) {
    let mut next = None;
    loop {
        let command = match next.take() {
            Some(command) => command,
            None => match rx.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            RelayCommand::Activate(duration_ms) => {
                let call = timeout(limit, relay.activate(duration_ms));
                tokio::pin!(call);
                let mut flushed = Vec::new();
                loop {
                    tokio::select! {
                        biased;
                        result = &mut call => {
                            match result {
                                Ok(Ok(())) => info!("Relay '{}' activated for {}ms", relay.name(), duration_ms),
                                Ok(Err(e)) => warn!("Relay activate failed ({}): {}", e.as_label(), e),
                                Err(_) => warn!("Relay activate failed: {}", RelayError::Timeout(limit)),
                            }
                            break;
                        }
                        queued = rx.recv() => match queued {
                            Some(RelayCommand::Flush(done)) => flushed.push(done),
                            Some(command) => {
                                debug!("Relay activate superseded before it finished");
                                next = Some(command);
                                break;
                            }
                            None => {
                                let _ = (&mut call).await;
                                break;
                            }
                        },
                    }
                }
                for done in flushed {
                    let _ = done.send(());
                }
            }
            RelayCommand::Deactivate => match timeout(limit, relay.deactivate()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Relay deactivate failed ({}): {}", e.as_label(), e),
                Err(_) => warn!("Relay deactivate failed: {}", RelayError::Timeout(limit)),
            },
            RelayCommand::Shutdown(done) => {
                match timeout(limit, relay.shutdown()).await {
                    Ok(Ok(())) => info!("Relay '{}' released", relay.name()),
                    Ok(Err(e)) => warn!("Relay shutdown failed: {}", e),
                    Err(_) => warn!("Relay shutdown failed: {}", RelayError::Timeout(limit)),
                }
                let _ = done.send(());
            }
            RelayCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatcher_swallows_failures() {
        let relay = Arc::new(RecordingRelay::failing());
        let dispatcher = RelayDispatcher::new(relay.clone(), Duration::from_secs(1));

        dispatcher.activate(500);
        dispatcher.deactivate();
        dispatcher.flush().await;
        assert_eq!(relay.calls(), vec![RelayCall::Activate(500), RelayCall::Deactivate]);
        assert!(!dispatcher.health().await.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatcher_bounds_hung_calls() {
        let relay = Arc::new(RecordingRelay::hanging(Duration::from_secs(3600)));
        let dispatcher = RelayDispatcher::new(relay.clone(), Duration::from_millis(100));

        dispatcher.activate(0);
        dispatcher.flush().await;
        assert_eq!(relay.activations(), 1);

        // The worker moves on to the next call after the timeout
        dispatcher.deactivate();
        dispatcher.flush().await;
        assert_eq!(relay.calls(), vec![RelayCall::Activate(0), RelayCall::Deactivate]);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_supersedes_slow_activate() {
        let relay = Arc::new(RecordingRelay::slow_activate(Duration::from_millis(300)));
        let dispatcher = RelayDispatcher::new(relay.clone(), Duration::from_secs(1));

        dispatcher.activate(0);
        tokio::time::sleep(Duration::from_millis(120)).await;
        dispatcher.deactivate();
        dispatcher.flush().await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!relay.is_on());
        assert_eq!(relay.calls(), vec![RelayCall::Activate(0), RelayCall::Deactivate]);
    }

    #[tokio::test]
    async fn calls_run_in_order() {
        let relay = Arc::new(RecordingRelay::new());
        let dispatcher = RelayDispatcher::new(relay.clone(), Duration::from_secs(1));

        dispatcher.deactivate();
        dispatcher.activate(3_000);
        dispatcher.deactivate();
        dispatcher.shutdown().await;
        assert_eq!(
            relay.calls(),
            vec![
                RelayCall::Deactivate,
                RelayCall::Activate(3_000),
                RelayCall::Deactivate,
                RelayCall::Deactivate,
            ]
        );
        assert!(!relay.is_on());
    }

    #[tokio::test]
    async fn disabled_backend_builds_noop() {
        let settings = RelaySettings {
            backend: RelayBackend::None,
            pin: 17,
            active_high: true,
            url: String::new(),
            chip: "gpiochip0".to_string(),
            timeout: Duration::from_secs(1),
        };
        let relay = build(&settings).await;
        assert_eq!(relay.name(), "none");
        assert!(relay.health().await.ok);
    }
}
