//! Filter edit debouncing
//!
//! Rapid UI edits (dragging a bitrate slider, clicking several format toggles)
//! are coalesced: every edit restarts the window, and only the last state is
//! compiled into a predicate once the window elapses quietly.

use std::time::Duration;
use tokio::time::Instant;

use crate::models::FilterState;

/// Coalesces filter edits into a single predicate swap
#[derive(Debug)]
pub struct FilterDebouncer {
    window: Duration,
    pending: Option<(FilterState, Instant)>,
}

impl FilterDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record an edit made at `now`; replaces any pending edit
    pub fn schedule(&mut self, state: FilterState, now: Instant) {
        self.pending = Some((state, now + self.window));
    }

    /// When the pending edit becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Latest scheduled (not yet applied) state
    pub fn pending(&self) -> Option<&FilterState> {
        self.pending.as_ref().map(|(state, _)| state)
    }

    /// Take the pending state regardless of the window
    pub fn flush(&mut self) -> Option<FilterState> {
        self.pending.take().map(|(state, _)| state)
    }

    /// Drop any pending edit
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(min: u32) -> FilterState {
        FilterState { min_bitrate: min, ..Default::default() }
    }

    #[test]
    fn test_deadline_is_one_window_after_edit() {
        let mut debouncer = FilterDebouncer::new(Duration::from_millis(200));
        assert!(debouncer.deadline().is_none());
        let t0 = Instant::now();
        debouncer.schedule(state(128), t0);
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(200)));
        debouncer.cancel();
        assert!(debouncer.deadline().is_none());
        assert!(debouncer.pending().is_none());
    }

    #[test]
    fn test_rapid_edits_coalesce_to_last() {
        let mut debouncer = FilterDebouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        debouncer.schedule(state(128), t0);
        debouncer.schedule(state(192), t0 + Duration::from_millis(150));
        debouncer.schedule(state(256), t0 + Duration::from_millis(300));

        // Window restarts on every edit
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(500)));
        assert_eq!(debouncer.flush(), Some(state(256)));
        assert!(debouncer.flush().is_none());
    }

    #[test]
    fn test_flush_ignores_window() {
        let mut debouncer = FilterDebouncer::new(Duration::from_secs(60));
        debouncer.schedule(state(320), Instant::now());
        assert_eq!(debouncer.pending(), Some(&state(320)));
        assert_eq!(debouncer.flush(), Some(state(320)));
        assert!(debouncer.deadline().is_none());
    }
}
