//! Top-level error for the Discord adapter.

use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::gateway::GatewayError;
use crate::rest::RestError;

/// Errors surfaced by [`DiscordBot`](crate::DiscordBot).
#[derive(Debug, Error)]
pub enum DiscordError {
    /// No bot token in configuration or environment.
    #[error("Discord token is not configured")]
    MissingToken,

    /// A REST call failed.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// Outbound dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The gateway session ended with an error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Result alias for adapter operations.
pub type DiscordResult<T> = Result<T, DiscordError>;
