//! Error types for wkmp-sr
//!
//! Nothing in the search engine is fatal to the host process. Setter errors
//! leave the previous state in place; stream errors surface as session state.

use thiserror::Error;

use crate::models::RecordId;

/// Search engine error type
#[derive(Debug, Error)]
pub enum SearchError {
    /// Filter edit rejected (e.g. min bitrate above max bitrate)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Weight edit rejected (negative or non-finite)
    #[error("Invalid weight for {component}: {value}")]
    InvalidWeight { component: String, value: f64 },

    /// Preset name not configured
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Record id not present in the live collection
    #[error("Unknown record: {0}")]
    UnknownRecord(RecordId),

    /// Illegal session state transition
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::models::SearchState,
        to: crate::models::SearchState,
    },

    /// Download manager refused a request
    #[error("Download request failed: {0}")]
    Download(String),

    /// wkmp-common error
    #[error("Common error: {0}")]
    Common(#[from] wkmp_common::Error),
}

/// Result type for search engine operations
pub type SearchResult<T> = Result<T, SearchError>;
