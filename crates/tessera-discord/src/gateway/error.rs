//! Error types for the gateway session.

/// Errors produced by the gateway session manager and its transport.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// `WebSocket` transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Transport failure reported by a non-`WebSocket` connector.
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection was closed with a code.
    #[error("Connection closed with code {0}")]
    Closed(u16),

    /// Authentication failed (close code 4004).
    #[error("Authentication failed (close code 4004)")]
    AuthenticationFailed,

    /// The gateway rejected the session configuration (close codes
    /// 4010-4014: shard, API version or intents).
    #[error("Invalid gateway configuration (close code {0})")]
    InvalidConfiguration(u16),

    /// Consecutive reconnect attempts exceeded the configured limit.
    #[error("Gave up after {0} consecutive reconnect attempts")]
    ReconnectLimit(u32),

    /// Opening the transport did not finish in time.
    #[error("Timed out connecting to the gateway")]
    ConnectTimeout,

    /// The gateway did not send a Hello payload in time.
    #[error("Timed out waiting for Hello from Gateway")]
    HelloTimeout,

    /// Protocol violation from the gateway.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Whether the session manager must stop instead of reconnecting.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed | Self::InvalidConfiguration(_) | Self::ReconnectLimit(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert!(GatewayError::AuthenticationFailed.to_string().contains("4004"));
        assert!(
            GatewayError::InvalidConfiguration(4014)
                .to_string()
                .contains("4014")
        );
        assert!(GatewayError::HelloTimeout.to_string().contains("Hello"));
        assert!(GatewayError::Closed(4001).to_string().contains("4001"));
    }

    #[test]
    fn fatal_classification() {
        assert!(GatewayError::AuthenticationFailed.is_fatal());
        assert!(GatewayError::InvalidConfiguration(4013).is_fatal());
        assert!(GatewayError::ReconnectLimit(3).is_fatal());
        assert!(!GatewayError::Closed(4000).is_fatal());
        assert!(!GatewayError::HelloTimeout.is_fatal());
        assert!(!GatewayError::Transport("reset".into()).is_fatal());
    }
}
