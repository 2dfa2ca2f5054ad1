//! Ingestion of the raw candidate stream
//!
//! A background task reads the provider stream, drops malformed items, seeds
//! each record's download status and forwards batches to the engine over an
//! mpsc channel. The engine is the only writer of the live collection.

pub mod batcher;
pub mod json_lines;
pub mod pipeline;

use std::pin::Pin;

use futures::Stream;
use thiserror::Error;

pub use batcher::Batcher;
pub use json_lines::JsonLinesSource;
pub use pipeline::{spawn_ingest, IngestEvent, IngestHandle, IngestMessage, StreamEnd};

use crate::models::RawCandidate;

/// Per-item error reported by a candidate provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Item could not be decoded; skipped, the stream continues
    #[error("Malformed item: {0}")]
    Malformed(String),

    /// Provider failed; the stream is over
    #[error("Provider failure: {0}")]
    Provider(String),
}

/// Asynchronous, ordered sequence of raw candidates
pub type CandidateStream = Pin<Box<dyn Stream<Item = Result<RawCandidate, SourceError>> + Send>>;

/// Network-side producer of candidates for a query
pub trait CandidateSource: Send + Sync {
    /// Open a result stream for `query`. Dropping the stream stops the search.
    fn search(&self, query: &str, album_mode: bool) -> CandidateStream;
}
