//! Configuration file discovery and loading
//!
//! Gate configuration is a small TOML bootstrap file. Resolution order for
//! every setting is:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults are used. An explicitly requested file that does not exist, or a
//! file that fails to parse, is an error.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Directory name under the platform config directory
pub const CONFIG_DIR_NAME: &str = "feria";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the default path of a config file for the platform
///
/// Linux: `~/.config/feria/<file>`, falling back to `/etc/feria/<file>` when
/// only the system-wide file exists. macOS/Windows: the platform config dir.
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name));

    if cfg!(target_os = "linux") {
        if let Some(path) = user_config.as_ref() {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// Load a TOML config file, falling back to `T::default()` when absent
///
/// # Arguments
/// * `explicit` - Path given on the command line or via environment, if any
/// * `file_name` - File name used to locate the default config path
///
/// # Returns
/// The parsed (or default) config and the path it was read from, if any.
pub fn load_toml_or_default<T>(explicit: Option<&Path>, file_name: &str) -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = read_toml(path)?;
        info!("Loaded configuration from {}", path.display());
        return Ok((config, Some(path.to_path_buf())));
    }

    match default_config_path(file_name) {
        Some(path) if path.exists() => {
            let config = read_toml(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok((config, Some(path)))
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok((T::default(), None))
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok((T::default(), None))
        }
    }
}

/// Read and parse a TOML file
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    Ok(value)
}
