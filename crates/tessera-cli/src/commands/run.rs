//! Gateway run command.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use tessera_config::Config;
use tessera_discord::DiscordBot;
use tessera_events::{EventBus, TesseraEvent};
use tracing::info;

/// Connect to the gateway and print events until Ctrl+C or a fatal error.
///
/// Normalized events go to stdout as JSON lines; connection status goes to
/// stderr.
pub(crate) async fn run_bot(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let (bot, session) = DiscordBot::from_config(&config, bus)?;

    eprintln!("{}", "Connecting to Discord...".cyan().bold());
    eprintln!("  Gateway: {}", config.discord.gateway.yellow());
    eprintln!("  Press Ctrl+C to stop\n");

    let mut task = tokio::spawn(session.run());
    let interrupted = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break true,
            result = &mut task => {
                result??;
                break false;
            },
            Some(event) = events.recv() => print_event(&event)?,
        }
    };

    if interrupted {
        info!("Shutdown requested");
        bot.session().shutdown();
        task.await??;
    }

    eprintln!("{}", "Disconnected.".yellow());
    Ok(())
}

fn print_event(event: &TesseraEvent) -> Result<()> {
    match event {
        TesseraEvent::Dispatch { event, .. } => {
            println!("{}", serde_json::to_string(event)?);
        },
        TesseraEvent::Status { state, detail, .. } => {
            let label = match detail {
                Some(detail) => format!("{state} ({detail})"),
                None => state.to_string(),
            };
            eprintln!("{} {}", "status".dimmed(), label.cyan());
        },
        TesseraEvent::Fatal { message, .. } => {
            eprintln!("{} {}", "fatal".red().bold(), message);
        },
    }
    Ok(())
}
