//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working section.
//! Secrets are redacted from `Debug` and omitted from `Serialize`.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord credentials, endpoints and intents.
    pub discord: DiscordSection,
    /// Reconnect backoff policy for the gateway.
    pub reconnect: ReconnectSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// DiscordSection
// ---------------------------------------------------------------------------

/// Discord bot configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DiscordSection {
    /// Bot token from the Discord Developer Portal.
    /// Prefer the `TESSERA_DISCORD_TOKEN` environment variable.
    pub token: Option<String>,
    /// Gateway URL, without query string.
    pub gateway: String,
    /// REST API base URL.
    pub endpoint: String,
    /// Privileged intent opt-ins.
    pub intents: IntentsSection,
    /// Proxy URL for REST traffic (`http://`, `https://` or `socks5://`).
    /// The gateway connects directly.
    #[serde(alias = "proxyAgent")]
    pub proxy_agent: Option<String>,
    /// Extra headers added to every REST request.
    pub headers: BTreeMap<String, String>,
    /// Timeout for connection establishment and each REST call, in seconds.
    pub timeout_secs: u64,
    /// How many times a rate-limited (429) request is retried.
    pub max_rate_limit_retries: u32,
}

impl DiscordSection {
    /// The configured token, if present and non-empty.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token: None,
            gateway: "wss://gateway.discord.gg".to_owned(),
            endpoint: "https://discord.com/api/v10".to_owned(),
            intents: IntentsSection::default(),
            proxy_agent: None,
            headers: BTreeMap::new(),
            timeout_secs: 30,
            max_rate_limit_retries: 3,
        }
    }
}

impl std::fmt::Debug for DiscordSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSection")
            .field("has_token", &self.token.is_some())
            .field("gateway", &self.gateway)
            .field("endpoint", &self.endpoint)
            .field("intents", &self.intents)
            .field("has_proxy_agent", &self.proxy_agent.is_some())
            .field("header_names", &self.headers.keys().collect::<Vec<_>>())
            .field("timeout_secs", &self.timeout_secs)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .finish()
    }
}

impl Serialize for DiscordSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DiscordSection", 6)?;
        // token, proxy credentials and header values are omitted.
        state.serialize_field("gateway", &self.gateway)?;
        state.serialize_field("endpoint", &self.endpoint)?;
        state.serialize_field("intents", &self.intents)?;
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.serialize_field("max_rate_limit_retries", &self.max_rate_limit_retries)?;
        state.serialize_field("header_names", &self.headers.keys().collect::<Vec<_>>())?;
        state.end()
    }
}

/// Privileged gateway intents the bot opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentsSection {
    /// Receive guild member events (`GUILD_MEMBERS`).
    pub members: bool,
    /// Receive presence updates (`GUILD_PRESENCES`).
    pub presence: bool,
}

impl Default for IntentsSection {
    fn default() -> Self {
        Self {
            members: true,
            presence: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ReconnectSection
// ---------------------------------------------------------------------------

/// Gateway reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSection {
    /// Base delay for exponential backoff, in milliseconds.
    pub backoff_base_ms: u64,
    /// Upper bound for a single backoff delay, in milliseconds.
    pub backoff_max_ms: u64,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            backoff_base_ms: 1000,
            backoff_max_ms: 60_000,
            max_attempts: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tessera_discord=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
