//! Config file discovery and loading.
//!
//! Resolution order (later overrides earlier):
//! 1. Built-in defaults
//! 2. The config file: an explicit path, or `<config_dir>/kestrel/config.toml`
//! 3. Environment variables (`KESTREL_API_KEY`, `KESTREL_BIND`,
//!    `KESTREL_PROVIDER_URL`)
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, KestrelConfig, Result};

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "kestrel";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "KESTREL_CONFIG_DIR";

/// Result of config loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration.
    pub config: KestrelConfig,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

/// Load, override from the process environment, and validate.
///
/// An explicit `path` must exist. Without one, the default path is used if
/// present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

/// [`load_config`] with a custom environment lookup.
pub fn load_config_with_env<F>(path: Option<&Path>, lookup: F) -> Result<LoadedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let (mut config, source) = match path {
        Some(path) => (load_config_file(path)?, Some(path.to_path_buf())),
        None => match default_config_path() {
            Some(path) if path.is_file() => (load_config_file(&path)?, Some(path)),
            _ => (KestrelConfig::default(), None),
        },
    };

    config.apply_env(lookup);
    config.validate()?;

    Ok(LoadedConfig { config, source })
}

/// Parse a config file without applying overrides or validating.
pub fn load_config_file(path: &Path) -> Result<KestrelConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    KestrelConfig::from_toml(&contents)
}

/// The default config file path.
///
/// Checks `KESTREL_CONFIG_DIR` first, then the platform config directory
/// (`~/.config/kestrel/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
