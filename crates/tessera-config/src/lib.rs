#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Tessera Discord adapter.
//!
//! ```rust,no_run
//! use tessera_config::Config;
//!
//! // Defaults → ~/.tessera/config.toml → TESSERA_DISCORD_TOKEN.
//! let config = Config::load(None).unwrap();
//! println!("gateway: {}", config.discord.gateway);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** (`--config` path, or `~/.tessera/config.toml`)
//! 2. **Environment** (`TESSERA_DISCORD_TOKEN`, `DISCORD_TOKEN`), token only,
//!    used when the file leaves it unset
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other internal tessera crates;
//! conversion into runtime types happens where the adapter is built.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration from defaults, a config file and the environment,
    /// then validate it.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Validate this configuration.
    ///
    /// # Errors
    ///
    /// See [`validate::validate`].
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
