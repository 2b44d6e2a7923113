use std::time::{Duration, Instant};

pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);
/// Pause between accepting a file event and reading the file, so editors
/// can finish writing.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Decides which watcher events and timer ticks the sync loop acts on.
#[derive(Debug, Clone)]
pub struct EventGate {
    debounce: Duration,
    poll_interval: Duration,
    last_local_edit: Option<Instant>,
    last_remote_poll: Option<Instant>,
}

impl EventGate {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            debounce: DEBOUNCE_WINDOW,
            poll_interval,
            last_local_edit: None,
            last_remote_poll: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Accepts the edit and records it, unless the previous accepted edit is
    /// younger than the debounce window.
    pub fn admit_local_edit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_local_edit {
            if now.saturating_duration_since(last) < self.debounce {
                return false;
            }
        }
        self.last_local_edit = Some(now);
        true
    }

    /// A poll is skipped while a local edit is fresher than one poll interval.
    pub fn admit_poll(&self, now: Instant) -> bool {
        match self.last_local_edit {
            Some(last) => now.saturating_duration_since(last) >= self.poll_interval,
            None => true,
        }
    }

    pub fn record_poll(&mut self, now: Instant) {
        self.last_remote_poll = Some(now);
    }

    pub fn last_remote_poll(&self) -> Option<Instant> {
        self.last_remote_poll
    }
}

impl Default for EventGate {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
