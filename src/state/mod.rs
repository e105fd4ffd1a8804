//! State management module
//!
//! The authoritative countdown record, the snapshots derived from it and
//! the shared application state that serializes every mutation.

pub mod app_state;
pub mod countdown;
pub mod settings;

// Re-export main types
pub use app_state::{AppState, CountdownOptions};
pub use countdown::{normalize_duration, CountdownRecord, StateSnapshot};
pub use settings::{Settings, SettingsUpdate};
