//! Event envelope published on the bus.

use serde::{Deserialize, Serialize};
use tessera_core::Event;
use uuid::Uuid;

/// Metadata attached to every published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID.
    pub event_id: Uuid,
    /// When the event was published.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Component that published the event (e.g. `"discord-gateway"`).
    pub source: String,
}

impl EventMetadata {
    /// Create metadata for an event published now by `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
        }
    }
}

/// Lifecycle state of a gateway connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and none being attempted.
    #[default]
    Disconnected,
    /// Opening the transport and waiting for `Hello`.
    Connecting,
    /// Identify sent, waiting for `READY`.
    Identifying,
    /// Session established; dispatches are flowing.
    Ready,
    /// Resume sent, waiting for `RESUMED`.
    Resuming,
    /// Connection lost; waiting out the backoff delay.
    Reconnecting,
}

impl ConnectionState {
    /// Stable name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Identifying => "identifying",
            Self::Ready => "ready",
            Self::Resuming => "resuming",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an adapter reports to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TesseraEvent {
    /// A normalized platform event (including `send` acknowledgments).
    Dispatch {
        /// Event metadata.
        metadata: EventMetadata,
        /// The normalized event.
        event: Event,
    },
    /// The gateway connection changed state.
    Status {
        /// Event metadata.
        metadata: EventMetadata,
        /// New state.
        state: ConnectionState,
        /// Optional human-readable detail (e.g. `"resumed"`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// The adapter stopped because of an unrecoverable error.
    Fatal {
        /// Event metadata.
        metadata: EventMetadata,
        /// Error description.
        message: String,
    },
}

impl TesseraEvent {
    /// Short name of the event, used for logging and filtering.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Dispatch { event, .. } => event.kind.as_str(),
            Self::Status { .. } => "status",
            Self::Fatal { .. } => "fatal",
        }
    }

    /// Metadata of the event.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::Dispatch { metadata, .. }
            | Self::Status { metadata, .. }
            | Self::Fatal { metadata, .. } => metadata,
        }
    }

    /// The normalized event, for `Dispatch` events.
    #[must_use]
    pub fn as_dispatch(&self) -> Option<&Event> {
        match self {
            Self::Dispatch { event, .. } => Some(event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::EventKind;

    #[test]
    fn event_type_names() {
        let dispatch = TesseraEvent::Dispatch {
            metadata: EventMetadata::new("test"),
            event: Event::new(EventKind::MessageCreated, "bot"),
        };
        assert_eq!(dispatch.event_type(), "message-created");
        assert!(dispatch.as_dispatch().is_some());

        let status = TesseraEvent::Status {
            metadata: EventMetadata::new("test"),
            state: ConnectionState::Ready,
            detail: None,
        };
        assert_eq!(status.event_type(), "status");
        assert!(status.as_dispatch().is_none());
    }

    #[test]
    fn status_serializes_state_name() {
        let status = TesseraEvent::Status {
            metadata: EventMetadata::new("test"),
            state: ConnectionState::Reconnecting,
            detail: Some("zombie".into()),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["state"], "reconnecting");
        assert_eq!(json["detail"], "zombie");
        assert_eq!(json["metadata"]["source"], "test");
    }

    #[test]
    fn dispatch_round_trips_with_nested_event() {
        let dispatch = TesseraEvent::Dispatch {
            metadata: EventMetadata::new("discord-gateway"),
            event: Event::new(EventKind::Send, "100"),
        };
        let json = serde_json::to_value(&dispatch).unwrap();
        assert_eq!(json["type"], "dispatch");
        assert_eq!(json["event"]["type"], "send");

        let back: TesseraEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "send");
    }

    #[test]
    fn connection_state_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
    }
}
