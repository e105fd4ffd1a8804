//! Broadcast channel module
//!
//! Event types for the real-time channel and the hub that fans them out.

pub mod events;
pub mod hub;

// Re-export main types
pub use events::{ClientCommand, DurationRequest, ServerEvent};
pub use hub::{Hub, Subscription};
