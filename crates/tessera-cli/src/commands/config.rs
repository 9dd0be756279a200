//! Configuration commands.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tessera_config::{Config, loader};
use tessera_discord::gateway::Intents;

/// Print the merged configuration as TOML. Secrets are omitted.
pub(crate) fn show_config(config_path: Option<&Path>) -> Result<()> {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let config = loader::load_unvalidated(config_path, &env_vars)?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;

    println!("{rendered}");
    let token = if config.discord.token().is_some() {
        "set".green()
    } else {
        "not set".red()
    };
    println!("# token: {token}");
    Ok(())
}

/// Validate the configuration and report the result.
pub(crate) fn check_config(config_path: Option<&Path>) -> Result<()> {
    print!("  Checking configuration... ");
    match Config::load(config_path) {
        Ok(config) => {
            println!("{}", "OK".green());
            println!("    Gateway: {}", config.discord.gateway);
            println!("    Endpoint: {}", config.discord.endpoint);
            let intents = Intents::from_config(&config.discord.intents);
            println!("    Intents: {}", intents.bits());
            Ok(())
        },
        Err(e) => {
            println!("{}", "FAIL".red());
            Err(e.into())
        },
    }
}
