//! Countdown ticker background task
//!
//! At most one ticker runs at a time. Each one carries the generation it was
//! spawned for; restarting or stopping bumps the generation, so a superseded
//! task that was already waiting for the control lock exits without
//! publishing anything.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{broadcast::ServerEvent, state::AppState};

/// Bookkeeping for the single active ticker; guarded by `AppState::control`
#[derive(Debug, Default)]
pub struct TickerControl {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TickerControl {
    /// Cancel the active ticker, if any
    pub fn stop(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Ticker cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

/// What a single tick decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running, keep ticking
    Running,
    /// Deadline reached: `done` published and relay fired
    Completed,
    /// A newer start or a reset replaced this ticker
    Superseded,
}

/// Cancel any active ticker and spawn a new one for the current countdown.
///
/// Must be called with the control lock held.
pub fn restart(state: &Arc<AppState>, control: &mut TickerControl) {
    control.stop();
    let generation = control.generation;
    let period = state.tick_period;
    // Anchored here, not when the task first runs
    let first_tick = Instant::now() + period;
    let handle = tokio::spawn(ticker_task(Arc::clone(state), generation, first_tick, period));
    control.handle = Some(handle);
    debug!("Ticker {} started with period {:?}", generation, period);
}

/// Periodically sample the countdown until it completes or is superseded
pub async fn ticker_task(state: Arc<AppState>, generation: u64, first_tick: Instant, period: Duration) {
    let mut interval = interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match tick(&state, generation) {
            TickOutcome::Running => {}
            TickOutcome::Completed => break,
            TickOutcome::Superseded => {
                debug!("Ticker {} superseded", generation);
                break;
            }
        }
    }
}

/// One sampling cycle: broadcast `tick`, and on completion `done` plus the relay.
pub fn tick(state: &AppState, generation: u64) -> TickOutcome {
    let mut control = state.lock_control();
    if control.generation != generation {
        return TickOutcome::Superseded;
    }

    let snapshot = state.snapshot();
    let running = snapshot.running;
    debug!("Tick: {}ms remaining", snapshot.remaining_ms);
    state.hub.publish(ServerEvent::Tick(snapshot));

    if running {
        return TickOutcome::Running;
    }

    // Detach rather than abort: this may be the ticker task itself
    control.handle = None;
    control.generation = control.generation.wrapping_add(1);

    state.hub.publish(ServerEvent::Done);
    let relay_ms = state.relay_duration_ms();
    info!("Countdown complete, activating relay for {}ms", relay_ms);
    state.relay.activate(relay_ms);

    TickOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RecordingRelay, RelayCall};
    use crate::state::app_state::tests::{test_state, test_state_with_relay};

    /// Let spawned tasks run without moving the paused clock much
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_deadline_then_fires_done_once() {
        let (state, clock, relay) = test_state(45_000);
        let (mut sub, _) = state.connect();

        state.start(Some(3_000));
        assert!(matches!(sub.recv().await.unwrap(), ServerEvent::Start(_)));

        let mut remaining = Vec::new();
        for _ in 0..3 {
            clock.advance(1_000);
            tokio::time::advance(Duration::from_millis(1_000)).await;
            settle().await;
            match sub.recv().await.unwrap() {
                ServerEvent::Tick(s) => remaining.push(s.remaining_ms),
                other => panic!("expected tick, got {:?}", other),
            }
        }
        assert_eq!(remaining, vec![2_000, 1_000, 0]);
        assert_eq!(sub.recv().await.unwrap(), ServerEvent::Done);

        settle().await;
        assert!(!state.ticker_active());
        assert_eq!(relay.activations(), 1);
        assert_eq!(relay.calls(), vec![RelayCall::Deactivate, RelayCall::Activate(3_000)]);

        // Nothing more is published once complete
        clock.advance(5_000);
        tokio::time::advance(Duration::from_millis(5_000)).await;
        settle().await;
        assert!(sub.try_recv().is_err());
        assert_eq!(relay.activations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_completes_on_first_tick() {
        let (state, clock, relay) = test_state(45_000);
        let snap = state.start(Some(0));
        assert!(!snap.running);

        clock.advance(1_000);
        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle().await;

        assert_eq!(relay.activations(), 1);
        assert!(!state.ticker_active());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_previous_ticker() {
        let (state, clock, relay) = test_state(45_000);
        let (mut sub, _) = state.connect();

        state.start(Some(1_000));
        let first_generation = state.lock_control().generation;
        clock.advance(500);
        tokio::time::advance(Duration::from_millis(500)).await;
        state.start(Some(1_000));
        assert_ne!(state.lock_control().generation, first_generation);

        // Old ticker would have fired here and seen an expired deadline
        clock.advance(600);
        tokio::time::advance(Duration::from_millis(600)).await;
        settle().await;
        assert_eq!(relay.activations(), 0);

        clock.advance(400);
        tokio::time::advance(Duration::from_millis(400)).await;
        settle().await;
        assert_eq!(relay.activations(), 1);

        let mut dones = 0;
        while let Ok(event) = sub.try_recv() {
            if event == ServerEvent::Done {
                dones += 1;
            }
        }
        assert_eq!(dones, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_ticking_without_done() {
        let (state, clock, relay) = test_state(45_000);
        let (mut sub, _) = state.connect();

        state.start(Some(2_000));
        state.reset(None);
        clock.advance(5_000);
        tokio::time::advance(Duration::from_millis(5_000)).await;
        settle().await;

        assert!(matches!(sub.try_recv().unwrap(), ServerEvent::Start(_)));
        assert!(matches!(sub.try_recv().unwrap(), ServerEvent::Reset(_)));
        assert!(sub.try_recv().is_err());
        assert_eq!(relay.activations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_while_relay_is_switching_on_leaves_it_off() {
        let slow = RecordingRelay::slow_activate(Duration::from_millis(300));
        let (state, clock, relay) = test_state_with_relay(45_000, slow);

        state.start(Some(0));
        clock.advance(1_000);
        tokio::time::advance(Duration::from_millis(1_000)).await;
        settle().await;
        assert_eq!(relay.activations(), 1);

        // Activation is still in flight when the next countdown starts
        clock.advance(120);
        tokio::time::advance(Duration::from_millis(120)).await;
        assert!(state.start(Some(10_000)).running);

        clock.advance(500);
        tokio::time::advance(Duration::from_millis(500)).await;
        state.relay.flush().await;
        assert!(state.snapshot().running);
        assert!(!relay.is_on());
    }

    #[tokio::test]
    async fn stale_generation_is_superseded() {
        let (state, _, _) = test_state(45_000);
        let stale = state.lock_control().generation.wrapping_add(7);
        assert_eq!(tick(&state, stale), TickOutcome::Superseded);
    }
}
