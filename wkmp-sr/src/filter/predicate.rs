//! Filter predicate compiler
//!
//! Turns a [`FilterState`] into an immutable [`Predicate`] that the view
//! evaluates per record. The predicate is rebuilt on every (debounced) filter
//! change and swapped in as a whole.
//!
//! # VBR tolerance
//! Lossy VBR encoders under-report nominal bitrate, so the requested floor is
//! relaxed in fixed bands before comparison:
//!
//! | requested | effective floor |
//! |-----------|-----------------|
//! | >= 320    | 240             |
//! | >= 256    | 220             |
//! | >= 192    | 180             |
//! | otherwise | requested       |

use std::collections::BTreeSet;

use crate::models::{FilterState, ResultRecord};

/// Relaxed bitrate floor for a requested minimum
pub fn effective_floor(requested: u32) -> u32 {
    if requested >= 320 {
        240
    } else if requested >= 256 {
        220
    } else if requested >= 192 {
        180
    } else {
        requested
    }
}

/// Why a record failed the predicate (first failing check only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Bitrate,
    Format,
    Reliability,
}

/// Compiled, side-effect-free filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    floor: u32,
    /// `None` = every format passes
    formats: Option<BTreeSet<String>>,
    /// `Some(ceiling)` when the reliability guard is on
    queue_ceiling: Option<u32>,
}

impl Predicate {
    pub fn compile(state: &FilterState) -> Self {
        Self {
            floor: effective_floor(state.min_bitrate),
            formats: (!state.allowed_formats.is_empty()).then(|| state.allowed_formats.clone()),
            queue_ceiling: state.reliability_guard.then_some(state.queue_ceiling),
        }
    }

    /// Predicate that accepts everything
    pub fn accept_all() -> Self {
        Self::compile(&FilterState {
            min_bitrate: 0,
            allowed_formats: BTreeSet::new(),
            reliability_guard: false,
            ..Default::default()
        })
    }

    /// Bitrate, then format, then reliability; stops at the first failure
    pub fn evaluate(&self, record: &ResultRecord) -> Result<(), Rejection> {
        if record.bitrate < self.floor {
            return Err(Rejection::Bitrate);
        }
        if let Some(formats) = &self.formats {
            if !formats.contains(&record.format) {
                return Err(Rejection::Format);
            }
        }
        if let Some(ceiling) = self.queue_ceiling {
            if record.queue_depth > ceiling {
                return Err(Rejection::Reliability);
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &ResultRecord) -> bool {
        self.evaluate(record).is_ok()
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::accept_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawCandidate, RecordId, TrackStatus};

    fn record(bitrate: u32, format: &str, queue_depth: u32) -> ResultRecord {
        ResultRecord::from_candidate(
            RecordId(0),
            RawCandidate {
                filename: format!("track.{}", format.to_lowercase()),
                format: format.to_string(),
                bitrate,
                queue_depth,
                file_size: 0,
                peer_id: "p".into(),
                source_hash: "h".into(),
            },
            TrackStatus::Missing,
        )
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(effective_floor(320), 240);
        assert_eq!(effective_floor(1411), 240);
        assert_eq!(effective_floor(319), 220);
        assert_eq!(effective_floor(256), 220);
        assert_eq!(effective_floor(255), 180);
        assert_eq!(effective_floor(192), 180);
        assert_eq!(effective_floor(191), 191);
        assert_eq!(effective_floor(0), 0);
    }

    #[test]
    fn test_vbr_relaxation_example() {
        let state = FilterState { min_bitrate: 320, ..Default::default() };
        let predicate = Predicate::compile(&state);
        assert!(predicate.matches(&record(250, "MP3", 0)));
        assert_eq!(predicate.evaluate(&record(230, "MP3", 0)), Err(Rejection::Bitrate));
    }

    #[test]
    fn test_format_check() {
        let mut state = FilterState::default();
        state.set_exclusive_format("flac");
        let predicate = Predicate::compile(&state);
        assert!(predicate.matches(&record(900, "FLAC", 0)));
        assert_eq!(predicate.evaluate(&record(320, "MP3", 0)), Err(Rejection::Format));
    }

    #[test]
    fn test_empty_format_set_allows_all() {
        let predicate = Predicate::compile(&FilterState::default());
        assert!(predicate.matches(&record(128, "OGG", 0)));
    }

    #[test]
    fn test_reliability_guard() {
        let state = FilterState {
            reliability_guard: true,
            queue_ceiling: 5,
            ..Default::default()
        };
        let predicate = Predicate::compile(&state);
        assert!(predicate.matches(&record(320, "MP3", 5)));
        assert_eq!(predicate.evaluate(&record(320, "MP3", 6)), Err(Rejection::Reliability));

        let unguarded = Predicate::compile(&FilterState { queue_ceiling: 5, ..Default::default() });
        assert!(unguarded.matches(&record(320, "MP3", 500)));
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let mut state = FilterState {
            min_bitrate: 320,
            reliability_guard: true,
            queue_ceiling: 0,
            ..Default::default()
        };
        state.set_exclusive_format("flac");
        let predicate = Predicate::compile(&state);
        assert_eq!(predicate.evaluate(&record(128, "MP3", 99)), Err(Rejection::Bitrate));
        assert_eq!(predicate.evaluate(&record(320, "MP3", 99)), Err(Rejection::Format));
    }
}
