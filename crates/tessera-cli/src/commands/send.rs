//! One-off message sending.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use tessera_config::Config;
use tessera_discord::{DiscordBot, DiscordError, DispatchError};
use tessera_events::EventBus;

/// Where a message goes.
#[derive(Debug)]
pub(crate) enum Target {
    /// A channel, optionally in a guild.
    Channel {
        channel: String,
        guild: Option<String>,
    },
    /// A user's DM channel.
    User(String),
}

/// Send `content` without connecting to the gateway and print the created
/// message ids.
pub(crate) async fn send_message(
    config_path: Option<&Path>,
    target: Target,
    content: &str,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let (bot, _session) = DiscordBot::from_config(&config, EventBus::new())?;

    let result = match &target {
        Target::Channel { channel, guild } => {
            bot.send_message(channel, content, guild.as_deref()).await
        },
        Target::User(user) => bot.send_private_message(user, content).await,
    };

    match result {
        Ok(ids) if ids.is_empty() => {
            println!("{}", "Nothing to send.".yellow());
            Ok(())
        },
        Ok(ids) => {
            for id in ids {
                println!("{id}");
            }
            Ok(())
        },
        Err(DiscordError::Dispatch(DispatchError::Partial {
            delivered,
            pieces,
            source,
        })) => {
            for id in &delivered {
                println!("{id}");
            }
            anyhow::bail!(
                "only {} of {pieces} pieces were sent: {source}",
                delivered.len()
            )
        },
        Err(e) => Err(e.into()),
    }
}
