//! Normalized entity types shared by every platform adapter.
//!
//! Timestamps are Unix milliseconds. Optional fields are skipped when
//! serializing so the host sees only what the platform actually provided.

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user ID.
    pub id: String,
    /// Account name.
    pub name: String,
    /// Display name, if different from the account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    /// Create a user with an ID and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A guild (server).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// Platform guild ID.
    pub id: String,
    /// Guild name.
    #[serde(default)]
    pub name: String,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Guild {
    /// Create a guild reference carrying only its ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    /// The member's user account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Guild-specific nickname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Guild-specific avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// When the member joined, in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<i64>,
}

/// A guild role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRole {
    /// Platform role ID.
    pub id: String,
    /// Role name.
    pub name: String,
    /// RGB color, `0` when unset.
    #[serde(default)]
    pub color: u32,
    /// Sort position.
    #[serde(default)]
    pub position: i64,
    /// Permission bitset, kept as a decimal string.
    #[serde(default)]
    pub permissions: String,
    /// Whether members are listed separately.
    #[serde(default)]
    pub hoist: bool,
    /// Whether the role can be mentioned by everyone.
    #[serde(default)]
    pub mentionable: bool,
}

/// Broad channel category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    /// Text channel inside a guild.
    #[default]
    Text,
    /// One-to-one or group direct message channel.
    Direct,
    /// Category grouping other channels.
    Category,
    /// Voice or stage channel.
    Voice,
}

/// A channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Platform channel ID.
    pub id: String,
    /// Channel name. Direct channels usually have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Channel category.
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    /// Parent category or thread parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Channel {
    /// Create a channel reference carrying only its ID and kind.
    #[must_use]
    pub fn with_id(id: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Self::default()
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Platform message ID.
    pub id: String,
    /// Normalized markup content.
    #[serde(default)]
    pub content: String,
    /// Parsed segment chain of `content`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    /// Creation time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Last edit time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Author's guild membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// Channel the message was posted in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// Guild the message was posted in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<Guild>,
    /// Message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Box<Message>>,
}
