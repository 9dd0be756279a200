//! Tessera Discord - Discord adapter for the Tessera host.
//!
//! This crate provides:
//! - The Gateway session manager ([`GatewaySession`]): connect, identify or
//!   resume, heartbeat, reconnect with backoff, and publication of normalized
//!   events to an [`EventBus`](tessera_events::EventBus)
//! - A rate-limited REST client ([`HttpRequester`]) and typed API
//!   ([`DiscordApi`])
//! - The outbound dispatch pipeline ([`MessageDispatcher`]): markup is split
//!   into Discord-sized messages and each produced id is acknowledged with a
//!   `send` event
//! - [`DiscordBot`], the host-facing facade over all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_config::Config;
//! use tessera_discord::DiscordBot;
//! use tessera_events::EventBus;
//!
//! # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
//! let bus = EventBus::new();
//! let (bot, session) = DiscordBot::from_config(&config, bus.clone())?;
//! tokio::spawn(session.run());
//!
//! bot.send_message("42", "<quote id=99/>hello", None).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapt;
pub mod api;
mod bot;
pub mod dispatch;
pub mod encode;
mod error;
pub mod gateway;
pub mod rest;
#[allow(missing_docs)]
pub mod types;

pub use api::DiscordApi;
pub use bot::DiscordBot;
pub use dispatch::{DispatchError, DispatchResult, MessageDispatcher};
pub use error::{DiscordError, DiscordResult};
pub use gateway::{GatewayConfig, GatewayError, GatewaySession, SessionHandle};
pub use rest::{HttpRequester, Requester, RestError, Route};
