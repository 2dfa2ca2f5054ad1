//! Download manager seam
//!
//! The engine never downloads anything itself. It asks the manager for the
//! known state of a source hash when a record is ingested and hands it
//! requests when the user enqueues a result. State changes flow back on a
//! channel owned by the manager ([`DownloadManager::subscribe_states`]); the
//! engine only reads from it, so its own traffic can never crowd them out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use wkmp_common::events::{DownloadState, EventBus, WkmpEvent};

/// Buffered state changes per subscriber before the oldest are dropped
pub const STATE_CHANNEL_CAPACITY: usize = 1024;

/// One download state change for a source hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStateUpdate {
    pub source_hash: String,
    pub state: DownloadState,
}

/// Request to download one remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_hash: String,
    pub peer_id: String,
    pub filename: String,
    pub file_size: u64,
}

/// Download queue as seen from the search engine
pub trait DownloadManager: Send + Sync {
    /// Last known state of a source hash, if the manager has ever seen it
    fn active_state(&self, source_hash: &str) -> Option<DownloadState>;

    /// Queue a download; `Err` carries a user-visible reason
    fn enqueue(&self, request: DownloadRequest) -> Result<(), String>;

    /// Receiver for every state change published after this call
    fn subscribe_states(&self) -> broadcast::Receiver<TrackStateUpdate>;
}

/// Process-local download manager
///
/// Tracks states in a map and publishes every change on its state channel.
/// When an event bus is attached, changes are mirrored there as
/// [`WkmpEvent::TrackStateChanged`] for other listeners.
pub struct InMemoryDownloadManager {
    states: Mutex<HashMap<String, DownloadState>>,
    requests: Mutex<Vec<DownloadRequest>>,
    updates: broadcast::Sender<TrackStateUpdate>,
    event_bus: Option<Arc<EventBus>>,
}

impl InMemoryDownloadManager {
    pub fn new(event_bus: Option<Arc<EventBus>>) -> Self {
        let (updates, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            states: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            updates,
            event_bus,
        }
    }

    /// Record a state for `source_hash` and publish it
    pub fn set_state(&self, source_hash: &str, state: DownloadState) {
        match self.states.lock() {
            Ok(mut states) => {
                states.insert(source_hash.to_string(), state);
            }
            Err(_) => {
                warn!(source_hash, "Download state map poisoned, dropping update");
                return;
            }
        }
        debug!(source_hash, ?state, "Download state changed");
        // No subscriber yet is fine: new records are seeded from `active_state`
        let _ = self.updates.send(TrackStateUpdate {
            source_hash: source_hash.to_string(),
            state,
        });
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(WkmpEvent::TrackStateChanged {
                source_hash: source_hash.to_string(),
                state,
                timestamp: Utc::now(),
            });
        }
    }

    /// Requests accepted so far, oldest first
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryDownloadManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DownloadManager for InMemoryDownloadManager {
    fn active_state(&self, source_hash: &str) -> Option<DownloadState> {
        self.states.lock().ok()?.get(source_hash).copied()
    }

    fn enqueue(&self, request: DownloadRequest) -> Result<(), String> {
        if request.peer_id.is_empty() {
            return Err(format!("no peer for {}", request.filename));
        }
        let hash = request.source_hash.clone();
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(WkmpEvent::DownloadRequested {
                source_hash: request.source_hash.clone(),
                peer_id: request.peer_id.clone(),
                filename: request.filename.clone(),
                timestamp: Utc::now(),
            });
        }
        self.requests
            .lock()
            .map_err(|_| "download queue unavailable".to_string())?
            .push(request);
        self.set_state(&hash, DownloadState::Queued);
        Ok(())
    }

    fn subscribe_states(&self) -> broadcast::Receiver<TrackStateUpdate> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(hash: &str, peer: &str) -> DownloadRequest {
        DownloadRequest {
            source_hash: hash.into(),
            peer_id: peer.into(),
            filename: "a.flac".into(),
            file_size: 10,
        }
    }

    #[test]
    fn test_enqueue_records_request_and_state() {
        let manager = InMemoryDownloadManager::default();
        assert_eq!(manager.active_state("h1"), None);
        manager.enqueue(request("h1", "peer")).unwrap();
        assert_eq!(manager.active_state("h1"), Some(DownloadState::Queued));
        assert_eq!(manager.requests().len(), 1);
    }

    #[test]
    fn test_enqueue_without_peer_is_rejected() {
        let manager = InMemoryDownloadManager::default();
        assert!(manager.enqueue(request("h1", "")).is_err());
        assert!(manager.requests().is_empty());
    }

    #[tokio::test]
    async fn test_state_channel_carries_only_manager_updates() {
        let bus = Arc::new(EventBus::new(4));
        let manager = InMemoryDownloadManager::new(Some(Arc::clone(&bus)));
        let mut states = manager.subscribe_states();

        manager.set_state("h1", DownloadState::Downloading);
        // Unrelated bus traffic well past the bus capacity
        for _ in 0..32 {
            bus.emit_lossy(WkmpEvent::DownloadRequested {
                source_hash: "other".into(),
                peer_id: "peer".into(),
                filename: "x.mp3".into(),
                timestamp: Utc::now(),
            });
        }
        manager.set_state("h1", DownloadState::Completed);

        assert_eq!(
            states.try_recv().unwrap(),
            TrackStateUpdate {
                source_hash: "h1".into(),
                state: DownloadState::Downloading
            }
        );
        assert_eq!(states.try_recv().unwrap().state, DownloadState::Completed);
        assert!(states.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_state_changes_are_published() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let manager = InMemoryDownloadManager::new(Some(bus));

        manager.set_state("h1", DownloadState::Completed);
        match rx.recv().await.unwrap() {
            WkmpEvent::TrackStateChanged { source_hash, state, .. } => {
                assert_eq!(source_hash, "h1");
                assert_eq!(state, DownloadState::Completed);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
