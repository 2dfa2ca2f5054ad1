//! Search and download type definitions
//!
//! Supporting types shared between the search service (wkmp-sr) and the
//! download manager that consumes its selections.

use serde::{Deserialize, Serialize};

/// Download manager state for a single source track
///
/// Keyed by the source-track hash of the candidate file. Several search
/// results from different peers may share the same hash and therefore the
/// same download state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadState {
    /// Accepted by the download manager, waiting for a transfer slot
    Queued,
    /// Transfer in progress
    Downloading,
    /// File is on disk
    Completed,
    /// Transfer failed
    Failed,
    /// Removed from the queue by the user
    Cancelled,
}

impl DownloadState {
    /// True once the manager will no longer change this state on its own
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// How a search session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchEndReason {
    /// Stream exhausted with at least one result
    Completed,
    /// Stream exhausted without any result
    NoResults,
    /// Cancelled by the user or superseded by a new search
    Cancelled,
    /// Provider reported an error
    Failed,
}
