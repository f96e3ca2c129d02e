//! Configuration file management for the AIVAST client.
//!
//! Settings are read from `~/.config/aivast/config.toml` and can be
//! overridden through environment variables.
//!
//! Priority: environment > config file > built-in defaults

use aivast_core::{AivastError, ClientConfig, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BASE_URL: &str = "AIVAST_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "AIVAST_POLL_INTERVAL_MS";
pub const ENV_GUEST: &str = "AIVAST_GUEST";

/// Loads the client configuration.
///
/// With `path = None` the default location is used; a missing file there is
/// not an error. An explicitly given path must exist.
pub fn load_client_config(path: Option<&Path>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => ClientConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns the path to the configuration file: ~/.config/aivast/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("aivast").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ClientConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AivastError::config(format!(
            "Failed to read configuration file at {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: ClientConfig = toml::from_str(&content)?;
    tracing::debug!("[Config] Loaded {}", path.display());
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_BASE_URL) {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }

    if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
        config.poll_interval_ms = raw.trim().parse().map_err(|_| {
            AivastError::config(format!("{ENV_POLL_INTERVAL_MS} must be an integer, got '{raw}'"))
        })?;
    }

    if let Some(raw) = lookup(ENV_GUEST) {
        config.guest = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                return Err(AivastError::config(format!(
                    "{ENV_GUEST} must be a boolean, got '{raw}'"
                )));
            }
        };
    }

    Ok(())
}
