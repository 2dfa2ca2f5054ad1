//! Structured filter settings
//!
//! The filter state is the single authority for what the result view shows.
//! Edits go through [`FilterState::apply`], which returns a new validated
//! state and never mutates on failure.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use super::record::normalize_format;
use crate::error::{SearchError, SearchResult};

/// Formats exposed as individual toggles in the filter bar
pub const TOGGLE_FORMATS: [&str; 3] = ["MP3", "FLAC", "WAV"];

/// Active result filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    /// Requested bitrate floor (kbps) before VBR relaxation
    pub min_bitrate: u32,
    /// Upper bound of the preferred bitrate range (kbps)
    pub max_bitrate: u32,
    /// Normalized formats; empty means every format passes
    #[serde(rename = "formats", deserialize_with = "deserialize_formats")]
    pub allowed_formats: BTreeSet<String>,
    /// Reject peers whose upload queue exceeds `queue_ceiling`
    pub reliability_guard: bool,
    pub queue_ceiling: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            min_bitrate: 0,
            max_bitrate: 10_000,
            allowed_formats: BTreeSet::new(),
            reliability_guard: false,
            queue_ceiling: 50,
        }
    }
}

fn deserialize_formats<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().map(|f| normalize_format(f)).collect())
}

/// A single filter edit coming from the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    MinBitrate(u32),
    MaxBitrate(u32),
    /// Replace the allowed set wholesale
    Formats(Vec<String>),
    /// Toggle one format on or off
    FormatEnabled { format: String, enabled: bool },
    ReliabilityGuard(bool),
    QueueCeiling(u32),
}

impl FilterState {
    pub fn validate(&self) -> SearchResult<()> {
        if self.min_bitrate > self.max_bitrate {
            return Err(SearchError::InvalidFilter(format!(
                "min bitrate {} exceeds max bitrate {}",
                self.min_bitrate, self.max_bitrate
            )));
        }
        if let Some(bad) = self.allowed_formats.iter().find(|f| normalize_format(f) != **f) {
            return Err(SearchError::InvalidFilter(format!("format not normalized: {}", bad)));
        }
        Ok(())
    }

    /// Return the state with `update` applied, or an error if the result
    /// would violate an invariant. `self` is never modified.
    pub fn apply(&self, update: &FilterUpdate) -> SearchResult<FilterState> {
        let mut next = self.clone();
        match update {
            FilterUpdate::MinBitrate(value) => next.min_bitrate = *value,
            FilterUpdate::MaxBitrate(value) => next.max_bitrate = *value,
            FilterUpdate::Formats(formats) => {
                next.allowed_formats = formats
                    .iter()
                    .map(|f| normalize_format(f))
                    .filter(|f| !f.is_empty())
                    .collect();
            }
            FilterUpdate::FormatEnabled { format, enabled } => {
                let format = normalize_format(format);
                if format.is_empty() {
                    return Err(SearchError::InvalidFilter("empty format".to_string()));
                }
                next.set_format_enabled(format, *enabled);
            }
            FilterUpdate::ReliabilityGuard(on) => next.reliability_guard = *on,
            FilterUpdate::QueueCeiling(value) => next.queue_ceiling = *value,
        }
        next.validate()?;
        Ok(next)
    }

    /// True if `format` (normalized) passes the format check
    pub fn allows_format(&self, format: &str) -> bool {
        self.allowed_formats.is_empty() || self.allowed_formats.contains(format)
    }

    /// Enable exactly one format, clearing the others
    pub fn set_exclusive_format(&mut self, format: &str) {
        self.allowed_formats.clear();
        self.allowed_formats.insert(normalize_format(format));
    }

    fn set_format_enabled(&mut self, format: String, enabled: bool) {
        if enabled {
            // An empty set already allows everything
            if !self.allowed_formats.is_empty() {
                self.allowed_formats.insert(format);
            }
            return;
        }

        if self.allowed_formats.is_empty() {
            self.allowed_formats = TOGGLE_FORMATS.iter().map(|f| f.to_string()).collect();
        }
        self.allowed_formats.remove(&format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_above_max_rejected() {
        let state = FilterState { max_bitrate: 320, ..Default::default() };
        let result = state.apply(&FilterUpdate::MinBitrate(500));
        assert!(matches!(result, Err(SearchError::InvalidFilter(_))));
        assert_eq!(state.min_bitrate, 0);
    }

    #[test]
    fn test_formats_normalized() {
        let state = FilterState::default()
            .apply(&FilterUpdate::Formats(vec![".flac".into(), "Mp3".into(), "".into()]))
            .unwrap();
        let formats: Vec<_> = state.allowed_formats.iter().cloned().collect();
        assert_eq!(formats, vec!["FLAC".to_string(), "MP3".to_string()]);
    }

    #[test]
    fn test_disable_from_all_materializes_toggles() {
        let state = FilterState::default()
            .apply(&FilterUpdate::FormatEnabled { format: "wav".into(), enabled: false })
            .unwrap();
        assert!(state.allows_format("MP3"));
        assert!(state.allows_format("FLAC"));
        assert!(!state.allows_format("WAV"));
    }

    #[test]
    fn test_enable_on_empty_set_is_noop() {
        let state = FilterState::default()
            .apply(&FilterUpdate::FormatEnabled { format: "flac".into(), enabled: true })
            .unwrap();
        assert!(state.allowed_formats.is_empty());
        assert!(state.allows_format("OGG"));
    }

    #[test]
    fn test_exclusive_format() {
        let mut state = FilterState::default();
        state.set_exclusive_format("flac");
        assert!(state.allows_format("FLAC"));
        assert!(!state.allows_format("MP3"));
    }

    #[test]
    fn test_deserialize_normalizes_formats() {
        let state: FilterState = toml::from_str("formats = [\"flac\", \".wav\"]\nmin_bitrate = 192").unwrap();
        assert!(state.allowed_formats.contains("FLAC"));
        assert!(state.allowed_formats.contains("WAV"));
        assert_eq!(state.min_bitrate, 192);
        assert_eq!(state.max_bitrate, 10_000);
    }
}
