//! Typed dispatch events (`op=0`).
//!
//! The gateway names each dispatch in `t` and carries its payload in `d`.
//! [`DispatchEvent`] decodes that pair as an adjacently tagged enum; names
//! the adapter does not handle become [`DispatchEvent::Unknown`].

use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::types::{
    DiscordChannel, DiscordGuild, DiscordInteraction, DiscordMessage, GuildMemberPayload,
    GuildMemberRemovePayload, GuildRoleDeletePayload, GuildRolePayload, MessageDeletePayload,
    ReactionPayload, ReadyPayload, UnavailableGuild,
};

/// A decoded dispatch event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchEvent {
    /// Identify completed.
    Ready(ReadyPayload),
    /// Resume completed. The payload carries nothing useful.
    Resumed(IgnoredAny),
    /// A message was posted.
    MessageCreate(DiscordMessage),
    /// A message was edited. The payload may be partial.
    MessageUpdate(DiscordMessage),
    /// A message was deleted.
    MessageDelete(MessageDeletePayload),
    /// The bot joined a guild, or a guild became available.
    GuildCreate(DiscordGuild),
    /// Guild settings changed.
    GuildUpdate(DiscordGuild),
    /// The bot left a guild, or a guild became unavailable.
    GuildDelete(UnavailableGuild),
    /// A user joined a guild.
    GuildMemberAdd(GuildMemberPayload),
    /// A member changed.
    GuildMemberUpdate(GuildMemberPayload),
    /// A user left a guild.
    GuildMemberRemove(GuildMemberRemovePayload),
    /// A role was created.
    GuildRoleCreate(GuildRolePayload),
    /// A role changed.
    GuildRoleUpdate(GuildRolePayload),
    /// A role was deleted.
    GuildRoleDelete(GuildRoleDeletePayload),
    /// A channel was created.
    ChannelCreate(DiscordChannel),
    /// A channel changed.
    ChannelUpdate(DiscordChannel),
    /// A channel was deleted.
    ChannelDelete(DiscordChannel),
    /// A reaction was added.
    MessageReactionAdd(ReactionPayload),
    /// A reaction was removed.
    MessageReactionRemove(ReactionPayload),
    /// A slash command or component interaction.
    InteractionCreate(DiscordInteraction),
    /// Any dispatch name not listed above.
    #[serde(other)]
    Unknown,
}

impl DispatchEvent {
    /// Decode a dispatch from its event name and payload.
    ///
    /// Unrecognized names decode to [`DispatchEvent::Unknown`] whatever their
    /// payload. A recognized name with a malformed payload is an error.
    ///
    /// # Errors
    ///
    /// Returns the payload's deserialization error for recognized names.
    pub fn decode(name: &str, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        match serde_json::from_value(serde_json::json!({ "t": name, "d": data })) {
            Ok(event) => Ok(event),
            Err(err) => {
                // `Unknown` is a unit variant and rejects non-null content.
                match serde_json::from_value(serde_json::json!({ "t": name })) {
                    Ok(Self::Unknown) => Ok(Self::Unknown),
                    _ => Err(err),
                }
            },
        }
    }
}
