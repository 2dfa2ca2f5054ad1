//! Named weight/filter presets

use serde::{Deserialize, Serialize};

use super::filter_state::FilterState;
use super::record::normalize_format;
use super::weights::WeightVector;
use crate::error::SearchResult;

/// Filter fields a preset overwrites; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetFilter {
    pub min_bitrate: Option<u32>,
    pub max_bitrate: Option<u32>,
    pub formats: Option<Vec<String>>,
    pub reliability_guard: Option<bool>,
    pub queue_ceiling: Option<u32>,
}

/// Named (weights, partial filter) pair applied as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub weights: WeightVector,
    #[serde(default)]
    pub filter: PresetFilter,
}

impl Preset {
    /// Overwrite the targeted filter fields of `current`. Fails without side
    /// effects if the combined state is invalid.
    pub fn apply_filter(&self, current: &FilterState) -> SearchResult<FilterState> {
        let mut next = current.clone();
        let f = &self.filter;
        if let Some(v) = f.min_bitrate {
            next.min_bitrate = v;
        }
        if let Some(v) = f.max_bitrate {
            next.max_bitrate = v;
        }
        if let Some(formats) = &f.formats {
            next.allowed_formats = formats
                .iter()
                .map(|s| normalize_format(s))
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = f.reliability_guard {
            next.reliability_guard = v;
        }
        if let Some(v) = f.queue_ceiling {
            next.queue_ceiling = v;
        }
        next.validate()?;
        Ok(next)
    }

    /// Presets available when the config file defines none
    pub fn builtin() -> Vec<Preset> {
        vec![
            Preset {
                name: "balanced".to_string(),
                weights: WeightVector::default(),
                filter: PresetFilter {
                    min_bitrate: Some(0),
                    formats: Some(Vec::new()),
                    reliability_guard: Some(false),
                    ..Default::default()
                },
            },
            Preset {
                name: "audiophile".to_string(),
                weights: WeightVector {
                    quality: 3.0,
                    availability: 0.25,
                    musical: 1.0,
                    metadata: 0.75,
                    string: 1.0,
                },
                filter: PresetFilter {
                    min_bitrate: Some(320),
                    formats: Some(vec!["FLAC".to_string(), "WAV".to_string()]),
                    ..Default::default()
                },
            },
            Preset {
                name: "fast".to_string(),
                weights: WeightVector {
                    quality: 0.5,
                    availability: 3.0,
                    musical: 0.5,
                    metadata: 0.5,
                    string: 1.0,
                },
                filter: PresetFilter {
                    reliability_guard: Some(true),
                    queue_ceiling: Some(10),
                    ..Default::default()
                },
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overwrites_only_targeted_fields() {
        let current = FilterState {
            min_bitrate: 128,
            max_bitrate: 500,
            queue_ceiling: 99,
            ..Default::default()
        };
        let preset = Preset {
            name: "p".into(),
            weights: WeightVector::default(),
            filter: PresetFilter {
                min_bitrate: Some(256),
                formats: Some(vec!["flac".into()]),
                ..Default::default()
            },
        };
        let next = preset.apply_filter(&current).unwrap();
        assert_eq!(next.min_bitrate, 256);
        assert_eq!(next.max_bitrate, 500);
        assert_eq!(next.queue_ceiling, 99);
        assert!(next.allowed_formats.contains("FLAC"));
    }

    #[test]
    fn test_invalid_combination_rejected() {
        let current = FilterState { max_bitrate: 192, ..Default::default() };
        let preset = Preset {
            name: "p".into(),
            weights: WeightVector::default(),
            filter: PresetFilter { min_bitrate: Some(320), ..Default::default() },
        };
        assert!(preset.apply_filter(&current).is_err());
    }

    #[test]
    fn test_builtin_presets_are_valid() {
        for preset in Preset::builtin() {
            preset.weights.validate().unwrap();
            preset.apply_filter(&FilterState::default()).unwrap();
        }
    }
}
