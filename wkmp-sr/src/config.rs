//! Configuration for wkmp-sr
//!
//! Loaded once at startup from TOML. Resolution order follows the other WKMP
//! modules (see `wkmp_common::config`):
//! 1. `--config <path>`
//! 2. `WKMP_SR_CONFIG`
//! 3. `<config_dir>/wkmp/wkmp-sr.toml`
//! 4. Built-in defaults
//!
//! Every field has a default, so a partial file is always valid TOML-wise;
//! [`SearchConfig::validate`] then checks the cross-field invariants.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use wkmp_common::config::load_module_config;

use crate::error::{SearchError, SearchResult};
use crate::models::{FilterState, Preset, WeightVector};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WKMP_SR_CONFIG";

/// File name looked up in the per-user config directory
pub const CONFIG_FILE_NAME: &str = "wkmp-sr.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub batching: BatchingConfig,

    /// Quiet period before a filter edit is compiled (ms)
    pub filter_debounce_ms: u64,

    /// Initial weight vector
    pub weights: WeightVector,

    /// Initial filter state
    pub filter: FilterState,

    /// Named presets; the built-in set is used when empty
    pub presets: Vec<Preset>,

    pub logging: LoggingConfig,

    /// EventBus channel capacity
    pub event_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batching: BatchingConfig::default(),
            filter_debounce_ms: 200,
            weights: WeightVector::default(),
            filter: FilterState::default(),
            presets: Vec::new(),
            logging: LoggingConfig::default(),
            event_capacity: 100,
        }
    }
}

/// Ingestion flush policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Flush when this much time has passed since the last flush (ms)
    pub flush_interval_ms: u64,
    /// Flush when the buffer holds this many items
    pub max_batch_size: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 250,
            max_batch_size: 50,
        }
    }
}

impl BatchingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SearchConfig {
    /// Resolve, load and validate the configuration
    pub fn load(cli_path: Option<&Path>) -> SearchResult<Self> {
        let config: SearchConfig = load_module_config(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME)?;
        config.validate()?;
        info!(
            presets = config.presets().len(),
            flush_interval_ms = config.batching.flush_interval_ms,
            max_batch_size = config.batching.max_batch_size,
            "Search configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.batching.max_batch_size == 0 {
            return Err(config_error("batching.max_batch_size must be at least 1"));
        }
        if self.batching.flush_interval_ms == 0 {
            return Err(config_error("batching.flush_interval_ms must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(config_error("event_capacity must be at least 1"));
        }
        self.weights.validate()?;
        self.filter.validate()?;

        let mut names = HashSet::new();
        for preset in &self.presets {
            if !names.insert(preset.name.as_str()) {
                return Err(config_error(&format!("duplicate preset name: {}", preset.name)));
            }
            preset.weights.validate()?;
            preset.apply_filter(&self.filter)?;
        }
        Ok(())
    }

    /// Configured presets, or the built-in set when none are configured
    pub fn presets(&self) -> Vec<Preset> {
        if self.presets.is_empty() {
            Preset::builtin()
        } else {
            self.presets.clone()
        }
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }
}

fn config_error(message: &str) -> SearchError {
    SearchError::Common(wkmp_common::Error::Config(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml_text: &str) -> SearchConfig {
        toml::from_str(toml_text).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.batching.flush_interval(), Duration::from_millis(250));
        assert_eq!(config.batching.max_batch_size, 50);
        assert_eq!(config.filter_debounce(), Duration::from_millis(200));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.presets().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse(
            r#"
            filter_debounce_ms = 50

            [weights]
            quality = 2.5

            [filter]
            min_bitrate = 192
            formats = ["flac", ".wav"]
            "#,
        );
        assert_eq!(config.filter_debounce_ms, 50);
        assert_eq!(config.weights.quality, 2.5);
        assert_eq!(config.weights.availability, 0.5);
        assert_eq!(config.filter.min_bitrate, 192);
        assert_eq!(config.filter.max_bitrate, 10_000);
        assert!(config.filter.allowed_formats.contains("FLAC"));
        assert!(config.filter.allowed_formats.contains("WAV"));
        assert_eq!(config.batching.max_batch_size, 50);
    }

    #[test]
    fn test_custom_presets_replace_builtins() {
        let config = parse(
            r#"
            [[presets]]
            name = "lossless"
            weights = { quality = 4.0 }
            filter = { formats = ["FLAC"] }
            "#,
        );
        let presets = config.presets();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "lossless");
        assert_eq!(presets[0].weights.quality, 4.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let inverted = parse("[filter]\nmin_bitrate = 500\nmax_bitrate = 100");
        assert!(matches!(inverted.validate(), Err(SearchError::InvalidFilter(_))));

        let negative = parse("[weights]\nstring = -1.0");
        assert!(matches!(negative.validate(), Err(SearchError::InvalidWeight { .. })));

        let zero_batch = parse("[batching]\nmax_batch_size = 0");
        assert!(matches!(zero_batch.validate(), Err(SearchError::Common(_))));

        let dupes = parse("[[presets]]\nname = \"a\"\n[[presets]]\nname = \"a\"");
        assert!(dupes.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batching]\nflush_interval_ms = 10\nmax_batch_size = 5").unwrap();
        let config = SearchConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.batching.flush_interval_ms, 10);
        assert_eq!(config.batching.max_batch_size, 5);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SearchConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(SearchError::Common(_))));
    }
}
