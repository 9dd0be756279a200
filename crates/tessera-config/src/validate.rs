//! Validation rules applied after loading.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first invalid field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_discord(config)?;
    validate_reconnect(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_discord(config: &Config) -> ConfigResult<()> {
    let discord = &config.discord;

    if discord.token().is_none() {
        return Err(invalid(
            "discord.token",
            "a bot token is required (set it in the config file or TESSERA_DISCORD_TOKEN)",
        ));
    }

    if !(discord.gateway.starts_with("wss://") || discord.gateway.starts_with("ws://")) {
        return Err(invalid(
            "discord.gateway",
            format!("expected a ws:// or wss:// URL, got '{}'", discord.gateway),
        ));
    }

    if !(discord.endpoint.starts_with("https://") || discord.endpoint.starts_with("http://")) {
        return Err(invalid(
            "discord.endpoint",
            format!("expected an http:// or https:// URL, got '{}'", discord.endpoint),
        ));
    }

    if let Some(proxy) = &discord.proxy_agent {
        let supported = ["http://", "https://", "socks5://", "socks5h://"];
        if !supported.iter().any(|scheme| proxy.starts_with(scheme)) {
            return Err(invalid(
                "discord.proxy_agent",
                format!("unsupported proxy scheme; expected one of: {}", supported.join(", ")),
            ));
        }
    }

    if let Some(name) = discord
        .headers
        .keys()
        .find(|name| name.eq_ignore_ascii_case("authorization"))
    {
        return Err(invalid(
            "discord.headers",
            format!("'{name}' is set from the bot token and cannot be overridden"),
        ));
    }

    if discord.timeout_secs == 0 {
        return Err(invalid("discord.timeout_secs", "must be greater than zero"));
    }

    Ok(())
}

fn validate_reconnect(config: &Config) -> ConfigResult<()> {
    let reconnect = &config.reconnect;

    if reconnect.backoff_base_ms == 0 {
        return Err(invalid("reconnect.backoff_base_ms", "must be greater than zero"));
    }

    if reconnect.backoff_max_ms < reconnect.backoff_base_ms {
        return Err(invalid(
            "reconnect.backoff_max_ms",
            format!(
                "must be at least backoff_base_ms ({})",
                reconnect.backoff_base_ms
            ),
        ));
    }

    if reconnect.max_attempts == Some(0) {
        return Err(invalid(
            "reconnect.max_attempts",
            "must be greater than zero; omit it to retry forever",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.discord.token = Some("T".to_owned());
        config
    }

    fn failing_field(config: &Config) -> String {
        match validate(config) {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_with_token_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(failing_field(&Config::default()), "discord.token");
    }

    #[test]
    fn test_gateway_scheme() {
        let mut config = valid_config();
        config.discord.gateway = "https://gateway.discord.gg".to_owned();
        assert_eq!(failing_field(&config), "discord.gateway");
    }

    #[test]
    fn test_proxy_scheme() {
        let mut config = valid_config();
        config.discord.proxy_agent = Some("ftp://proxy".to_owned());
        assert_eq!(failing_field(&config), "discord.proxy_agent");

        config.discord.proxy_agent = Some("socks5://127.0.0.1:1080".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_authorization_header_rejected() {
        let mut config = valid_config();
        config
            .discord
            .headers
            .insert("authorization".to_owned(), "Bot other".to_owned());
        assert_eq!(failing_field(&config), "discord.headers");
    }

    #[test]
    fn test_backoff_bounds() {
        let mut config = valid_config();
        config.reconnect.backoff_max_ms = 10;
        assert_eq!(failing_field(&config), "reconnect.backoff_max_ms");

        let mut config = valid_config();
        config.reconnect.max_attempts = Some(0);
        assert_eq!(failing_field(&config), "reconnect.max_attempts");
    }

    #[test]
    fn test_logging_values() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_owned();
        assert_eq!(failing_field(&config), "logging.level");

        let mut config = valid_config();
        config.logging.format = "xml".to_owned();
        assert_eq!(failing_field(&config), "logging.format");
    }
}
