//! Discord API object shapes.
//!
//! Only the fields the adapter reads are modelled; unknown fields are
//! ignored. Request bodies skip unset fields so that Discord applies its own
//! defaults.

use serde::{Deserialize, Serialize};

/// Discord user object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Guild member object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordMember {
    #[serde(default)]
    pub user: Option<DiscordUser>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Role object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordRole {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub mentionable: bool,
}

/// Channel types the adapter distinguishes.
pub mod channel_type {
    pub const GUILD_TEXT: u8 = 0;
    pub const DM: u8 = 1;
    pub const GUILD_VOICE: u8 = 2;
    pub const GROUP_DM: u8 = 3;
    pub const GUILD_CATEGORY: u8 = 4;
    pub const GUILD_STAGE_VOICE: u8 = 13;
}

/// Channel object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub recipients: Vec<DiscordUser>,
}

/// Guild object (also the partial guild returned by `/users/@me/guilds`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Guild delete payload. `unavailable = true` means an outage, not removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnavailableGuild {
    pub id: String,
    #[serde(default)]
    pub unavailable: bool,
}

/// Message attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordAttachment {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl DiscordAttachment {
    /// Whether the attachment is an image, by MIME type or extension.
    #[must_use]
    pub fn is_image(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            return content_type.starts_with("image/");
        }
        let lower = self.filename.to_ascii_lowercase();
        [".png", ".jpg", ".jpeg", ".gif", ".webp"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

/// Embed image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

/// Message embed. Outbound embeds only carry an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordEmbed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

impl DiscordEmbed {
    /// An embed showing a single image.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image: Some(EmbedImage { url: url.into() }),
            ..Self::default()
        }
    }
}

/// Reply reference on a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_if_not_exists: Option<bool>,
}

impl MessageReference {
    /// Reference a message to reply to. A missing target does not fail the
    /// send.
    #[must_use]
    pub fn reply(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            fail_if_not_exists: Some(false),
            ..Self::default()
        }
    }
}

/// Message object. Update dispatches carry partial messages, so most fields
/// default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub author: Option<DiscordUser>,
    #[serde(default)]
    pub member: Option<DiscordMember>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub attachments: Vec<DiscordAttachment>,
    #[serde(default)]
    pub embeds: Vec<DiscordEmbed>,
    #[serde(default)]
    pub message_reference: Option<MessageReference>,
    #[serde(default)]
    pub referenced_message: Option<Box<DiscordMessage>>,
}

/// Message delete payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageDeletePayload {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Member add/update payload: a member object plus its guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuildMemberPayload {
    pub guild_id: String,
    #[serde(flatten)]
    pub member: DiscordMember,
}

/// Member remove payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuildMemberRemovePayload {
    pub guild_id: String,
    pub user: DiscordUser,
}

/// Role create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuildRolePayload {
    pub guild_id: String,
    pub role: DiscordRole,
}

/// Role delete payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuildRoleDeletePayload {
    pub guild_id: String,
    pub role_id: String,
}

/// Emoji in a reaction. Unicode emoji have no id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiscordEmoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reaction add/remove payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReactionPayload {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub member: Option<DiscordMember>,
    pub emoji: DiscordEmoji,
}

/// Interaction types.
pub mod interaction_type {
    pub const APPLICATION_COMMAND: u8 = 2;
}

/// Interaction payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiscordInteraction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<DiscordMember>,
    #[serde(default)]
    pub user: Option<DiscordUser>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// `READY` dispatch payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    pub user: DiscordUser,
}

/// `POST /channels/{id}/messages` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<DiscordEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
}

/// `PATCH /channels/{id}/messages/{id}` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditMessage {
    pub content: String,
}

/// `POST /users/@me/channels` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateDm {
    pub recipient_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_parses_with_minimal_fields() {
        let msg: DiscordMessage =
            serde_json::from_str(r#"{"id":"1","channel_id":"42"}"#).unwrap();
        assert_eq!(msg.id, "1");
        assert!(msg.author.is_none());
        assert!(msg.content.is_empty());
    }

    #[test]
    fn member_payload_flattens_member() {
        let payload: GuildMemberPayload = serde_json::from_value(serde_json::json!({
            "guild_id": "g1",
            "user": { "id": "u1", "username": "alice" },
            "nick": "Al",
            "roles": ["r1"],
            "joined_at": "2024-01-01T00:00:00+00:00",
        }))
        .unwrap();
        assert_eq!(payload.guild_id, "g1");
        assert_eq!(payload.member.nick.as_deref(), Some("Al"));
        assert_eq!(payload.member.user.unwrap().username, "alice");
    }

    #[test]
    fn create_message_skips_unset_fields() {
        let body = CreateMessage {
            content: "hi".into(),
            ..CreateMessage::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "content": "hi" })
        );

        let body = CreateMessage {
            content: String::new(),
            embeds: vec![DiscordEmbed::image("https://x/y.png")],
            message_reference: Some(MessageReference::reply("99")),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["embeds"][0]["image"]["url"], "https://x/y.png");
        assert_eq!(json["message_reference"]["message_id"], "99");
        assert_eq!(json["message_reference"]["fail_if_not_exists"], false);
    }

    #[test]
    fn attachment_image_detection() {
        let mut att = DiscordAttachment {
            id: "1".into(),
            filename: "cat.PNG".into(),
            url: "https://cdn/cat.PNG".into(),
            content_type: None,
        };
        assert!(att.is_image());
        att.content_type = Some("application/pdf".into());
        assert!(!att.is_image());
    }
}
