//! Two-way mirroring between the backend and a local checkbox document.

mod diff;
mod engine;
mod gate;

pub use diff::diff_line;
pub use engine::{PushReport, SyncEngine, SyncError};
pub use gate::{EventGate, DEBOUNCE_WINDOW, DEFAULT_POLL_INTERVAL, SETTLE_DELAY};
