//! Event types for WKMP event system
//!
//! Provides shared event definitions and EventBus for all WKMP modules.

mod search_types;

pub use search_types::{DownloadState, SearchEndReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// WKMP event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
/// All events use this central enum for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WkmpEvent {
    /// Search session started
    ///
    /// Triggers:
    /// - SSE: Clear result table, show progress indicator
    SearchStarted {
        /// Session UUID
        session_id: Uuid,
        /// Query text as submitted by the user
        query: String,
        /// Text actually sent to the network after token extraction
        effective_query: String,
        /// When the session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Search progress update
    ///
    /// Emitted once per batch flush, never per result.
    ///
    /// Triggers:
    /// - SSE: Update status line and hidden-result counter
    SearchProgress {
        /// Session UUID
        session_id: Uuid,
        /// Results materialized so far
        found: usize,
        /// Results passing the active filter
        visible: usize,
        /// Results hidden by the active filter
        hidden: usize,
        /// Human-readable status line
        status_text: String,
        /// When progress was reported
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Search session reached a terminal state
    ///
    /// Triggers:
    /// - SSE: Stop progress indicator, show final status
    SearchEnded {
        /// Session UUID
        session_id: Uuid,
        /// Terminal reason
        reason: SearchEndReason,
        /// Total results materialized
        found: usize,
        /// Failure message (only for `SearchEndReason::Failed`)
        message: Option<String>,
        /// When the session ended
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Download state of a source track changed
    ///
    /// Emitted by the download manager. Every search result sharing the
    /// source-track hash reflects the new state.
    TrackStateChanged {
        /// Source-track hash
        source_hash: String,
        /// New download state
        state: DownloadState,
        /// When the state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Download requested for a search result
    ///
    /// Triggers:
    /// - Download manager: informational (the request itself goes through
    ///   the manager interface)
    /// - SSE: Mark row as pending
    DownloadRequested {
        /// Source-track hash
        source_hash: String,
        /// Remote peer offering the file
        peer_id: String,
        /// Remote filename
        filename: String,
        /// When the request was made
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WkmpEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            WkmpEvent::SearchStarted { .. } => "SearchStarted",
            WkmpEvent::SearchProgress { .. } => "SearchProgress",
            WkmpEvent::SearchEnded { .. } => "SearchEnded",
            WkmpEvent::TrackStateChanged { .. } => "TrackStateChanged",
            WkmpEvent::DownloadRequested { .. } => "DownloadRequested",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Capacity Recommendations
///
/// - Development/Desktop: 1000
/// - Raspberry Pi Zero2W: 500
/// - Testing: 10-100
///
/// # Examples
///
/// ```
/// use wkmp_common::events::{DownloadState, EventBus, WkmpEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(WkmpEvent::TrackStateChanged {
///     source_hash: "abc123".to_string(),
///     state: DownloadState::Completed,
///     timestamp: chrono::Utc::now(),
/// }).ok();
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "TrackStateChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WkmpEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after subscription.
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WkmpEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WkmpEvent,
    ) -> Result<usize, broadcast::error::SendError<WkmpEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// This is useful for non-critical events where it's acceptable if
    /// no component is currently listening (progress updates, status lines).
    pub fn emit_lossy(&self, event: WkmpEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
