//! Config file discovery and layered loading.
//!
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the user file (explicit path, or `~/.tessera/config.toml`)
//! 3. Fill an unset token from `TESSERA_DISCORD_TOKEN` / `DISCORD_TOKEN`
//! 4. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variables consulted for the bot token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["TESSERA_DISCORD_TOKEN", "DISCORD_TOKEN"];

/// Load configuration from defaults, a config file and the environment.
///
/// With `path = None` the user file `~/.tessera/config.toml` is used if it
/// exists. An explicit path must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or if the
/// merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let config = load_unvalidated(path, &env_vars)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Load and merge configuration without validating it.
///
/// Used by `config show` so that an incomplete configuration can still be
/// inspected.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed.
pub fn load_unvalidated(
    path: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let overlay = match path {
        Some(explicit) => Some((read_file(explicit)?, explicit.to_path_buf())),
        None => {
            let user_path = default_config_path()?;
            try_load_file(&user_path)?.map(|overlay| (overlay, user_path))
        },
    };

    if let Some((overlay, path)) = overlay {
        deep_merge(&mut merged, overlay);
        info!(path = %path.display(), "loaded config file");
    }

    let mut config = merged.try_into::<Config>().map_err(|e| ConfigError::ParseError {
        path: path.map_or_else(|| "<merged>".to_owned(), |p| p.display().to_string()),
        source: e,
    })?;

    apply_env_fallbacks(&mut config, env_vars);
    Ok(config)
}

/// Load a single config file on top of the defaults and validate it.
///
/// Environment variables are not consulted.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable, malformed or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let config = load_unvalidated(Some(path), &HashMap::new())?;
    validate::validate(&config)?;
    Ok(config)
}

/// Default location of the user config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if the home directory is unknown.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".tessera").join("config.toml"))
        .ok_or(ConfigError::NoHomeDir)
}

fn apply_env_fallbacks(config: &mut Config, env_vars: &HashMap<String, String>) {
    if config.discord.token().is_some() {
        return;
    }
    let from_env = TOKEN_ENV_VARS.iter().find_map(|name| {
        env_vars
            .get(*name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (*name, v.clone()))
    });
    if let Some((name, token)) = from_env {
        debug!(var = name, "using bot token from environment");
        config.discord.token = Some(token);
    }
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value replaces the base value.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

/// Read and parse a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_checked(path, &content)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_checked(path, &content).map(Some)
}

fn parse_checked(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
