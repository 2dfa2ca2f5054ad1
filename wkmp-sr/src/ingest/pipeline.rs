//! Background ingestion task
//!
//! One task per search session. It owns the provider stream and a
//! [`CancellationToken`]; everything it produces is tagged with the session id
//! so the engine can discard output of a session it has already replaced.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{Batcher, CandidateStream, SourceError};
use crate::models::{RawCandidate, TrackStatus};
use crate::services::DownloadManager;

/// How the candidate stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Natural exhaustion
    Exhausted,
    /// Cancellation token fired
    Cancelled,
    /// Provider failure with a user-visible message
    Failed(String),
}

#[derive(Debug)]
pub enum IngestEvent {
    /// Validated candidates with their seeded status, in arrival order
    Batch(Vec<(RawCandidate, TrackStatus)>),
    /// Always the last message of a session
    Finished(StreamEnd),
}

#[derive(Debug)]
pub struct IngestMessage {
    pub session_id: Uuid,
    pub event: IngestEvent,
}

/// Handle to a running ingestion task
#[derive(Debug)]
pub struct IngestHandle {
    cancel_token: CancellationToken,
}

impl IngestHandle {
    /// Stop consuming the stream. Records already buffered are still flushed.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Spawn the ingestion task for one session
pub fn spawn_ingest(
    session_id: Uuid,
    stream: CandidateStream,
    downloads: Arc<dyn DownloadManager>,
    flush_interval: Duration,
    max_batch_size: usize,
    tx: mpsc::UnboundedSender<IngestMessage>,
) -> IngestHandle {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();
    tokio::spawn(async move {
        run_ingest(
            session_id,
            stream,
            downloads,
            flush_interval,
            max_batch_size,
            token,
            tx,
        )
        .await;
    });

    IngestHandle { cancel_token }
}

async fn run_ingest(
    session_id: Uuid,
    mut stream: CandidateStream,
    downloads: Arc<dyn DownloadManager>,
    flush_interval: Duration,
    max_batch_size: usize,
    cancel_token: CancellationToken,
    tx: mpsc::UnboundedSender<IngestMessage>,
) {
    let mut batcher = Batcher::new(flush_interval, max_batch_size);
    let mut skipped = 0usize;

    let end = loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                info!(%session_id, "Ingestion cancelled");
                break StreamEnd::Cancelled;
            }

            item = stream.next() => match item {
                Some(Ok(candidate)) => {
                    if let Err(reason) = candidate.validate() {
                        skipped += 1;
                        warn!(%session_id, %reason, "Skipping malformed candidate");
                        continue;
                    }
                    let status = TrackStatus::seeded_from(downloads.active_state(&candidate.source_hash));
                    batcher.push((candidate, status));
                    if batcher.is_full() && !send_batch(&tx, session_id, &mut batcher) {
                        return;
                    }
                }
                Some(Err(SourceError::Malformed(reason))) => {
                    skipped += 1;
                    warn!(%session_id, %reason, "Skipping malformed candidate");
                }
                Some(Err(SourceError::Provider(message))) => {
                    error!(%session_id, %message, "Candidate provider failed");
                    break StreamEnd::Failed(message);
                }
                None => break StreamEnd::Exhausted,
            },

            // Measured from the last flush of either kind
            _ = sleep_until(batcher.deadline()), if !batcher.is_empty() => {
                if batcher.is_due(Instant::now()) && !send_batch(&tx, session_id, &mut batcher) {
                    return;
                }
            }
        }
    };

    // Remainder is flushed on every kind of ending
    if !batcher.is_empty() && !send_batch(&tx, session_id, &mut batcher) {
        return;
    }

    debug!(%session_id, total = batcher.total(), skipped, ?end, "Ingestion finished");
    let _ = tx.send(IngestMessage {
        session_id,
        event: IngestEvent::Finished(end),
    });
}

/// Returns false when the engine side is gone
fn send_batch(
    tx: &mpsc::UnboundedSender<IngestMessage>,
    session_id: Uuid,
    batcher: &mut Batcher<(RawCandidate, TrackStatus)>,
) -> bool {
    let batch = batcher.flush(Instant::now());
    debug!(%session_id, size = batch.len(), "Flushing batch");
    tx.send(IngestMessage {
        session_id,
        event: IngestEvent::Batch(batch),
    })
    .is_ok()
}
