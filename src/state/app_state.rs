//! Main application state management

use std::{
    sync::{Arc, Mutex, MutexGuard, RwLock},
    time::{Duration, Instant},
};
use tracing::{debug, info};

use super::{CountdownRecord, Settings, SettingsUpdate, StateSnapshot};
use crate::{
    broadcast::{Hub, ServerEvent, Subscription},
    clock::Clock,
    config::Config,
    relay::{RelayDispatcher, RelayHealth},
    tasks::ticker::{self, TickerControl},
};

/// Countdown parameters fixed at startup
#[derive(Debug, Clone)]
pub struct CountdownOptions {
    pub default_duration_ms: u64,
    pub tick_period: Duration,
    pub relay_duration_ms: u64,
}

impl From<&Config> for CountdownOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_duration_ms: config.default_duration_ms,
            tick_period: config.tick_period(),
            relay_duration_ms: config.relay_duration_ms,
        }
    }
}

/// Process-wide countdown state shared by the API, the sockets and the ticker.
///
/// Start, reset and every tick take `control` first, so mutations and the
/// completion check are serialized and the broadcast order matches the
/// mutation order. Snapshot reads only take the record's read lock.
#[derive(Debug)]
pub struct AppState {
    pub(crate) record: RwLock<CountdownRecord>,
    pub(crate) control: Mutex<TickerControl>,
    settings: RwLock<Settings>,
    pub clock: Arc<dyn Clock>,
    pub hub: Hub,
    pub relay: RelayDispatcher,
    pub tick_period: Duration,
    /// Server metadata
    pub start_time: Instant,
}

impl AppState {
    pub fn new(options: CountdownOptions, clock: Arc<dyn Clock>, relay: RelayDispatcher) -> Self {
        Self {
            record: RwLock::new(CountdownRecord::new(options.default_duration_ms)),
            control: Mutex::new(TickerControl::default()),
            settings: RwLock::new(Settings::new(options.default_duration_ms, options.relay_duration_ms)),
            clock,
            hub: Hub::default(),
            relay,
            tick_period: options.tick_period,
            start_time: Instant::now(),
        }
    }

    /// Current time-derived view of the countdown
    pub fn snapshot(&self) -> StateSnapshot {
        let now = self.clock.now_ms();
        self.record.read().unwrap_or_else(|e| e.into_inner()).snapshot(now)
    }

    /// Start a countdown, reusing the stored duration when none is given.
    ///
    /// Broadcasts `start`, switches the relay off and replaces any running
    /// ticker with a fresh one.
    pub fn start(self: &Arc<Self>, duration_ms: Option<u64>) -> StateSnapshot {
        let mut control = self.lock_control();

        let now = self.clock.now_ms();
        let snapshot = self
            .record
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .start(duration_ms, now);
        info!(
            "Countdown started: {}ms (ends at {:?})",
            snapshot.duration_ms, snapshot.end_time
        );

        self.relay.deactivate();
        self.hub.publish(ServerEvent::Start(snapshot.clone()));
        ticker::restart(self, &mut control);

        snapshot
    }

    /// Disarm the countdown and stop the ticker, optionally storing a new duration
    pub fn reset(&self, duration_ms: Option<u64>) -> StateSnapshot {
        let mut control = self.lock_control();
        control.stop();

        let now = self.clock.now_ms();
        let snapshot = self
            .record
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .reset(duration_ms, now);
        info!("Countdown reset (duration {}ms)", snapshot.duration_ms);

        self.hub.publish(ServerEvent::Reset(snapshot.clone()));
        snapshot
    }

    /// Register an observer and take the snapshot it must be greeted with.
    ///
    /// Both happen under the control lock, so every later event on the
    /// subscription was produced after the returned snapshot.
    pub fn connect(&self) -> (Subscription, StateSnapshot) {
        let _control = self.lock_control();
        let subscription = self.hub.subscribe();
        (subscription, self.snapshot())
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Resume a lagged subscription.
    ///
    /// Buffered events are discarded and replaced by the current snapshot,
    /// under the control lock so nothing older than the snapshot follows it.
    pub fn resync(&self, subscription: &mut Subscription) -> StateSnapshot {
        let _control = self.lock_control();
        let skipped = subscription.discard_pending();
        debug!("Discarded {} stale events", skipped);
        self.snapshot()
    }

    /// Apply a settings update.
    ///
    /// A new default duration resets the countdown to that duration and
    /// broadcasts `reset`, but only while idle: a running countdown, or one
    /// whose `done` is still pending, is left alone.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings, String> {
        let control = self.lock_control();

        let next = {
            let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
            let next = update.apply(&settings)?;
            *settings = next.clone();
            next
        };

        info!("Settings updated: {:?}", next);

        if update.default_duration_seconds.is_some() && !control.is_active() {
            let now = self.clock.now_ms();
            let mut record = self.record.write().unwrap_or_else(|e| e.into_inner());
            if !record.is_running(now) {
                let snapshot = record.reset(Some(next.default_duration_ms()), now);
                drop(record);
                info!("Default duration applied ({}ms)", snapshot.duration_ms);
                self.hub.publish(ServerEvent::Reset(snapshot));
            }
        }

        Ok(next)
    }

    pub fn relay_duration_ms(&self) -> u64 {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).relay_duration_ms
    }

    pub async fn relay_health(&self) -> RelayHealth {
        self.relay.health().await
    }

    /// True while a ticker task is scheduled
    pub fn ticker_active(&self) -> bool {
        self.lock_control().is_active()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    pub(crate) fn lock_control(&self) -> MutexGuard<'_, TickerControl> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }
}
