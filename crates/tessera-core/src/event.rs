//! Normalized events delivered to the host application.

use serde::{Deserialize, Serialize};

use crate::PLATFORM;
use crate::entity::{Channel, Guild, GuildMember, GuildRole, Message, User};

/// Kind of a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A message was posted.
    MessageCreated,
    /// A message was edited.
    MessageUpdated,
    /// A message was deleted.
    MessageDeleted,
    /// The bot joined a guild or the guild became available.
    GuildAdded,
    /// Guild settings changed.
    GuildUpdated,
    /// The bot left a guild or the guild became unavailable.
    GuildRemoved,
    /// A user joined a guild.
    GuildMemberAdded,
    /// A member's guild profile changed.
    GuildMemberUpdated,
    /// A user left a guild.
    GuildMemberRemoved,
    /// A role was created.
    GuildRoleCreated,
    /// A role was changed.
    GuildRoleUpdated,
    /// A role was deleted.
    GuildRoleDeleted,
    /// A channel was created.
    ChannelAdded,
    /// A channel was changed.
    ChannelUpdated,
    /// A channel was deleted.
    ChannelRemoved,
    /// A reaction was added to a message.
    ReactionAdded,
    /// A reaction was removed from a message.
    ReactionRemoved,
    /// A slash command was invoked.
    #[serde(rename = "interaction/command")]
    InteractionCommand,
    /// The bot sent a message.
    Send,
}

impl EventKind {
    /// Stable name of the event kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageCreated => "message-created",
            Self::MessageUpdated => "message-updated",
            Self::MessageDeleted => "message-deleted",
            Self::GuildAdded => "guild-added",
            Self::GuildUpdated => "guild-updated",
            Self::GuildRemoved => "guild-removed",
            Self::GuildMemberAdded => "guild-member-added",
            Self::GuildMemberUpdated => "guild-member-updated",
            Self::GuildMemberRemoved => "guild-member-removed",
            Self::GuildRoleCreated => "guild-role-created",
            Self::GuildRoleUpdated => "guild-role-updated",
            Self::GuildRoleDeleted => "guild-role-deleted",
            Self::ChannelAdded => "channel-added",
            Self::ChannelUpdated => "channel-updated",
            Self::ChannelRemoved => "channel-removed",
            Self::ReactionAdded => "reaction-added",
            Self::ReactionRemoved => "reaction-removed",
            Self::InteractionCommand => "interaction/command",
            Self::Send => "send",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a conversation is a direct message or a group channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    /// One-to-one conversation.
    Direct,
    /// Guild channel or group conversation.
    Group,
}

/// A normalized event.
///
/// Only the fields relevant to [`EventKind`] are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// When the adapter produced the event, in Unix milliseconds.
    pub timestamp: i64,
    /// ID of the bot account that observed the event.
    pub self_id: String,
    /// Originating platform.
    pub platform: String,
    /// Direct or group conversation, for message-like events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<Subtype>,
    /// User the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Guild the event happened in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<Guild>,
    /// Member the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// Role the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<GuildRole>,
    /// Channel the event happened in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// Message the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// User who performed the action, when distinct from `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<User>,
    /// Emoji for reaction events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Raw platform payload for events the schema does not cover fully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Event {
    /// Create an event of the given kind stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, self_id: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now().timestamp_millis(),
            self_id: self_id.into(),
            platform: PLATFORM.to_owned(),
            subtype: None,
            user: None,
            guild: None,
            member: None,
            role: None,
            channel: None,
            message: None,
            operator: None,
            emoji: None,
            raw: None,
        }
    }

    /// ID of the channel the event happened in, if any.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str())
    }

    /// ID of the message the event concerns, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.id.as_str())
    }
}
