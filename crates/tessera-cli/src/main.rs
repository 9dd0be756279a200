//! Tessera CLI - Discord adapter runner
//!
//! Connects a bot account to the Discord gateway and prints normalized events,
//! sends one-off messages through the REST API, and inspects configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tessera_telemetry::LogConfig;

mod commands;

use commands::{config, run, send};

/// Tessera - Discord adapter
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file (default: ~/.tessera/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the gateway and print events as JSON lines
    Run,

    /// Send a message through the REST API
    Send {
        /// Channel to send to
        #[arg(long, required_unless_present = "user", conflicts_with = "user")]
        channel: Option<String>,

        /// Send a direct message to this user instead
        #[arg(long)]
        user: Option<String>,

        /// Guild the channel belongs to
        #[arg(long, requires = "channel")]
        guild: Option<String>,

        /// Message markup
        content: String,
    },

    /// View and check configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration (secrets omitted)
    Show,
    /// Validate the configuration
    Check,
}

fn log_config(cli: &Cli) -> LogConfig {
    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let mut log_config =
        match tessera_config::loader::load_unvalidated(cli.config.as_deref(), &env_vars) {
            Ok(cfg) => tessera_telemetry::to_log_config(&cfg.logging),
            // Fallback if config loading fails; the command reports the error.
            Err(_) => LogConfig::default(),
        };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    log_config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = tessera_telemetry::setup_logging(&log_config(&cli)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run => run::run_bot(config_path).await,
        Commands::Send {
            channel,
            user,
            guild,
            content,
        } => {
            let target = match (channel, user) {
                (_, Some(user)) => send::Target::User(user),
                (Some(channel), None) => send::Target::Channel { channel, guild },
                (None, None) => anyhow::bail!("either --channel or --user is required"),
            };
            send::send_message(config_path, target, &content).await
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config(config_path),
            ConfigCommands::Check => config::check_config(config_path),
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_requires_a_target() {
        assert!(Cli::try_parse_from(["tessera", "send", "hi"]).is_err());
        assert!(
            Cli::try_parse_from(["tessera", "send", "--channel", "1", "--user", "2", "hi"])
                .is_err()
        );
    }

    #[test]
    fn send_to_channel_parses() {
        let cli = Cli::try_parse_from([
            "tessera", "send", "--channel", "42", "--guild", "7", "<b>hi</b>",
        ])
        .unwrap();
        match cli.command {
            Commands::Send {
                channel,
                user,
                guild,
                content,
            } => {
                assert_eq!(channel.as_deref(), Some("42"));
                assert!(user.is_none());
                assert_eq!(guild.as_deref(), Some("7"));
                assert_eq!(content, "<b>hi</b>");
            },
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn global_config_flag_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["tessera", "config", "check", "-c", "/tmp/t.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Check
            }
        ));
    }
}
