//! Search result records
//!
//! A [`RawCandidate`] is what the network layer hands us; a [`ResultRecord`] is
//! the engine-owned, mutable copy that carries rank, percentile and download
//! status.

use serde::{Deserialize, Serialize};
use wkmp_common::events::DownloadState;

/// Stable identity of a record inside the live collection
///
/// Ids are allocated monotonically for the lifetime of an engine, so an id
/// from a discarded session never aliases a record of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Candidate file as reported by a remote peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Remote path, usually backslash separated
    pub filename: String,
    /// Container format; derived from the filename extension when empty
    #[serde(default)]
    pub format: String,
    /// Nominal bitrate in kbps (unreliable for VBR encodings)
    #[serde(default)]
    pub bitrate: u32,
    /// Remote upload queue length
    #[serde(default)]
    pub queue_depth: u32,
    /// File size in bytes
    #[serde(default)]
    pub file_size: u64,
    /// Peer (user) offering the file
    pub peer_id: String,
    /// Source-track hash; shared by identical files on different peers
    pub source_hash: String,
}

impl RawCandidate {
    /// Reject items that cannot become a usable record
    pub fn validate(&self) -> Result<(), String> {
        if self.filename.trim().is_empty() {
            return Err("empty filename".to_string());
        }
        if self.source_hash.trim().is_empty() {
            return Err(format!("missing source hash for {}", self.filename));
        }
        Ok(())
    }
}

/// Download status of a result as seen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackStatus {
    #[default]
    Missing,
    Pending,
    Downloaded,
    Failed,
}

impl TrackStatus {
    /// Initial status for a freshly ingested record whose hash the download
    /// manager already knows about. In-flight downloads seed as `Missing`.
    pub fn seeded_from(state: Option<DownloadState>) -> Self {
        match state {
            Some(DownloadState::Completed) => Self::Downloaded,
            Some(DownloadState::Failed) => Self::Failed,
            _ => Self::Missing,
        }
    }

    /// Status after a live state-change notification
    pub fn from_notification(state: DownloadState) -> Self {
        match state {
            DownloadState::Queued | DownloadState::Downloading => Self::Pending,
            DownloadState::Completed => Self::Downloaded,
            DownloadState::Failed => Self::Failed,
            DownloadState::Cancelled => Self::Missing,
        }
    }
}

/// Normalize an extension or format name: strip the leading dot, uppercase,
/// and fold common aliases.
pub fn normalize_format(raw: &str) -> String {
    let upper = raw.trim().trim_start_matches('.').to_ascii_uppercase();
    match upper.as_str() {
        "AIF" => "AIFF".to_string(),
        "WAVE" => "WAV".to_string(),
        _ => upper,
    }
}

const LOSSLESS_FORMATS: [&str; 5] = ["FLAC", "WAV", "AIFF", "ALAC", "APE"];

/// One search result owned by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub id: RecordId,
    pub filename: String,
    /// Normalized format (see [`normalize_format`])
    pub format: String,
    pub bitrate: u32,
    pub queue_depth: u32,
    pub file_size: u64,
    pub peer_id: String,
    pub source_hash: String,
    /// Current composite score
    pub rank: f64,
    /// Position within the visible view, 0.0 = best
    pub percentile: f64,
    pub status: TrackStatus,
}

impl ResultRecord {
    /// Build a record from a validated candidate
    pub fn from_candidate(id: RecordId, candidate: RawCandidate, status: TrackStatus) -> Self {
        let format = if candidate.format.trim().is_empty() {
            extension_of(&candidate.filename)
                .map(normalize_format)
                .unwrap_or_default()
        } else {
            normalize_format(&candidate.format)
        };

        Self {
            id,
            filename: candidate.filename,
            format,
            bitrate: candidate.bitrate,
            queue_depth: candidate.queue_depth,
            file_size: candidate.file_size,
            peer_id: candidate.peer_id,
            source_hash: candidate.source_hash,
            rank: 0.0,
            percentile: 0.0,
            status,
        }
    }

    pub fn is_lossless(&self) -> bool {
        LOSSLESS_FORMATS.contains(&self.format.as_str())
    }

    /// Final path component without extension
    pub fn file_stem(&self) -> &str {
        let name = base_name(&self.filename);
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Name of the directory containing the file, if the path has one
    pub fn parent_dir(&self) -> Option<&str> {
        let trimmed = self.filename.trim_end_matches(['\\', '/']);
        let cut = trimmed.rfind(['\\', '/'])?;
        let parent = &trimmed[..cut];
        let name = base_name(parent);
        (!name.is_empty()).then_some(name)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

fn extension_of(path: &str) -> Option<&str> {
    let name = base_name(path);
    let dot = name.rfind('.')?;
    (dot + 1 < name.len()).then(|| &name[dot + 1..])
}
