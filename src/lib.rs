//! Shared Countdown - one authoritative countdown broadcast to every viewer
//!
//! This library provides the countdown state machine, the ticker that drives
//! completion, the fan-out to connected observers and the relay actuator
//! that fires once when the countdown reaches zero.

pub mod api;
pub mod broadcast;
pub mod clock;
pub mod config;
pub mod relay;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use state::{AppState, CountdownOptions, StateSnapshot};
pub use utils::signals::shutdown_signal;
