//! Fan-out of countdown events to every connected observer

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::broadcast;
use tracing::debug;

use super::ServerEvent;

/// Default number of events buffered per observer before it lags
pub const DEFAULT_CAPACITY: usize = 64;

/// Broadcast hub shared by the ticker, the HTTP handlers and every socket.
///
/// Each observer gets its own receiver, so per-observer ordering matches
/// publish order and one slow or dead observer never blocks the others.
#[derive(Debug, Clone)]
pub struct Hub {
    tx: broadcast::Sender<ServerEvent>,
    observers: Arc<AtomicUsize>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            observers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Send an event to all observers. Having none connected is not an error.
    pub fn publish(&self, event: ServerEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {} to {} receivers", name, receivers),
            Err(_) => debug!("Published {} with no receivers", name),
        }
    }

    /// Register a new observer
    pub fn subscribe(&self) -> Subscription {
        self.observers.fetch_add(1, Ordering::SeqCst);
        Subscription {
            rx: self.tx.subscribe(),
            observers: Arc::clone(&self.observers),
        }
    }

    /// Number of observers currently registered
    pub fn observers(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One observer's ordered event stream; unregisters itself on drop
#[derive(Debug)]
pub struct Subscription {
    pub rx: broadcast::Receiver<ServerEvent>,
    observers: Arc<AtomicUsize>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Result<ServerEvent, broadcast::error::RecvError> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<ServerEvent, broadcast::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Drop every buffered event, returning how many were skipped
    pub fn discard_pending(&mut self) -> u64 {
        let mut skipped = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => skipped += 1,
                Err(broadcast::error::TryRecvError::Lagged(n)) => skipped += n,
                Err(_) => return skipped,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.observers.fetch_sub(1, Ordering::SeqCst);
    }
}
