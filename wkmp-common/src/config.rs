//! Configuration file resolution and loading
//!
//! Every WKMP module reads its bootstrap settings from a TOML file. The file is
//! located with the usual WKMP priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/wkmp/<module>.toml`)
//! 4. No file: the module falls back to its compiled defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a resolved configuration file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
}

/// Resolve the configuration file path for a module.
///
/// Returns `Ok(None)` when no file is configured and none exists in the user
/// config directory; the caller should then use built-in defaults.
///
/// An explicitly requested file (CLI or environment) that does not exist is an
/// error rather than a silent fallback.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<Option<(PathBuf, ConfigSource)>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf(), ConfigSource::CommandLine).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return require_exists(PathBuf::from(path), ConfigSource::Environment).map(Some);
        }
    }

    // Priority 3: ~/.config/wkmp/<file_name>
    if let Some(path) = user_config_path(file_name) {
        if path.exists() {
            return Ok(Some((path, ConfigSource::UserConfigDir)));
        }
        debug!(path = %path.display(), "No user config file present");
    }

    Ok(None)
}

/// Platform config file location for a module (`<config_dir>/wkmp/<file_name>`)
pub fn user_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wkmp").join(file_name))
}

fn require_exists(path: PathBuf, source: ConfigSource) -> Result<(PathBuf, ConfigSource)> {
    if path.exists() {
        Ok((path, source))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {} (from {:?})",
            path.display(),
            source
        )))
    }
}

/// Read and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let value = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    info!(path = %path.display(), "Loaded configuration file");
    Ok(value)
}

/// Resolve and load a module config, falling back to `T::default()` when no
/// file is found.
pub fn load_module_config<T: DeserializeOwned + Default>(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<T> {
    match resolve_config_path(cli_arg, env_var_name, file_name)? {
        Some((path, source)) => {
            debug!(path = %path.display(), ?source, "Resolved config file");
            load_toml(&path)
        }
        None => {
            info!("No config file found for {}, using built-in defaults", file_name);
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        size: u32,
    }

    #[test]
    #[serial]
    fn test_cli_path_takes_priority() {
        let dir = tempfile::tempdir().unwrap();
        let cli = dir.path().join("cli.toml");
        let env = dir.path().join("env.toml");
        std::fs::write(&cli, "name = \"cli\"").unwrap();
        std::fs::write(&env, "name = \"env\"").unwrap();

        std::env::set_var("WKMP_TEST_CONFIG_A", &env);
        let resolved = resolve_config_path(Some(&cli), "WKMP_TEST_CONFIG_A", "none.toml").unwrap();
        std::env::remove_var("WKMP_TEST_CONFIG_A");

        let (path, source) = resolved.unwrap();
        assert_eq!(path, cli);
        assert_eq!(source, ConfigSource::CommandLine);
    }

    #[test]
    #[serial]
    fn test_env_path_used_without_cli() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("env.toml");
        std::fs::write(&env, "name = \"env\"\nsize = 7").unwrap();

        std::env::set_var("WKMP_TEST_CONFIG_B", &env);
        let loaded: Sample = load_module_config(None, "WKMP_TEST_CONFIG_B", "none.toml").unwrap();
        std::env::remove_var("WKMP_TEST_CONFIG_B");

        assert_eq!(loaded, Sample { name: "env".into(), size: 7 });
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let result = resolve_config_path(Some(&missing), "WKMP_TEST_CONFIG_UNSET", "x.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_error_reported_as_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "size = \"not a number\"").unwrap();
        let result: Result<Sample> = load_toml(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
