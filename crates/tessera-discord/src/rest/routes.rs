//! Discord REST routes.
//!
//! A [`Route`] names one endpoint with its parameters. Routes know their
//! HTTP method, path and rate-limit bucket key; the bucket keeps the major
//! parameter (channel or guild) and masks the rest, as Discord does.

use reqwest::Method;

/// A Discord REST endpoint with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Route {
    CreateMessage {
        channel_id: String,
    },
    GetMessage {
        channel_id: String,
        message_id: String,
    },
    EditMessage {
        channel_id: String,
        message_id: String,
    },
    DeleteMessage {
        channel_id: String,
        message_id: String,
    },
    /// One page of channel history, newest first.
    GetChannelMessages {
        channel_id: String,
        before: Option<String>,
        limit: u8,
    },
    GetUser {
        user_id: String,
    },
    GetChannel {
        channel_id: String,
    },
    GetGuild {
        guild_id: String,
    },
    GetCurrentUserGuilds,
    GetGuildChannels {
        guild_id: String,
    },
    GetGuildMember {
        guild_id: String,
        user_id: String,
    },
    /// One page of guild members, ordered by user id.
    GetGuildMembers {
        guild_id: String,
        after: Option<String>,
        limit: u16,
    },
    RemoveGuildMember {
        guild_id: String,
        user_id: String,
    },
    /// Open a DM channel with a user.
    CreateDm,
}

impl Route {
    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::CreateMessage { .. } | Self::CreateDm => Method::POST,
            Self::EditMessage { .. } => Method::PATCH,
            Self::DeleteMessage { .. } | Self::RemoveGuildMember { .. } => Method::DELETE,
            _ => Method::GET,
        }
    }

    /// Path below the API base, including any query string.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::CreateMessage { channel_id } => format!("/channels/{channel_id}/messages"),
            Self::GetMessage {
                channel_id,
                message_id,
            }
            | Self::EditMessage {
                channel_id,
                message_id,
            }
            | Self::DeleteMessage {
                channel_id,
                message_id,
            } => format!("/channels/{channel_id}/messages/{message_id}"),
            Self::GetChannelMessages {
                channel_id,
                before,
                limit,
            } => {
                let mut path = format!("/channels/{channel_id}/messages?limit={limit}");
                if let Some(before) = before {
                    path.push_str("&before=");
                    path.push_str(before);
                }
                path
            },
            Self::GetUser { user_id } => format!("/users/{user_id}"),
            Self::GetChannel { channel_id } => format!("/channels/{channel_id}"),
            Self::GetGuild { guild_id } => format!("/guilds/{guild_id}"),
            Self::GetCurrentUserGuilds => "/users/@me/guilds".to_owned(),
            Self::GetGuildChannels { guild_id } => format!("/guilds/{guild_id}/channels"),
            Self::GetGuildMember { guild_id, user_id }
            | Self::RemoveGuildMember { guild_id, user_id } => {
                format!("/guilds/{guild_id}/members/{user_id}")
            },
            Self::GetGuildMembers {
                guild_id,
                after,
                limit,
            } => {
                let mut path = format!("/guilds/{guild_id}/members?limit={limit}");
                if let Some(after) = after {
                    path.push_str("&after=");
                    path.push_str(after);
                }
                path
            },
            Self::CreateDm => "/users/@me/channels".to_owned(),
        }
    }

    /// Rate-limit bucket key: method plus path with minor ids masked.
    #[must_use]
    pub fn bucket(&self) -> String {
        let path = match self {
            Self::GetMessage { channel_id, .. }
            | Self::EditMessage { channel_id, .. }
            | Self::DeleteMessage { channel_id, .. } => {
                format!("/channels/{channel_id}/messages/:id")
            },
            Self::GetChannelMessages { channel_id, .. } | Self::CreateMessage { channel_id } => {
                format!("/channels/{channel_id}/messages")
            },
            Self::GetUser { .. } => "/users/:id".to_owned(),
            Self::GetGuildMember { guild_id, .. } | Self::RemoveGuildMember { guild_id, .. } => {
                format!("/guilds/{guild_id}/members/:id")
            },
            Self::GetGuildMembers { guild_id, .. } => format!("/guilds/{guild_id}/members"),
            _ => self.path(),
        };
        format!("{} {path}", self.method())
    }

    /// Stable name for logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMessage { .. } => "create_message",
            Self::GetMessage { .. } => "get_message",
            Self::EditMessage { .. } => "edit_message",
            Self::DeleteMessage { .. } => "delete_message",
            Self::GetChannelMessages { .. } => "get_channel_messages",
            Self::GetUser { .. } => "get_user",
            Self::GetChannel { .. } => "get_channel",
            Self::GetGuild { .. } => "get_guild",
            Self::GetCurrentUserGuilds => "get_current_user_guilds",
            Self::GetGuildChannels { .. } => "get_guild_channels",
            Self::GetGuildMember { .. } => "get_guild_member",
            Self::GetGuildMembers { .. } => "get_guild_members",
            Self::RemoveGuildMember { .. } => "remove_guild_member",
            Self::CreateDm => "create_dm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_and_methods() {
        let route = Route::CreateMessage {
            channel_id: "42".into(),
        };
        assert_eq!(route.method(), Method::POST);
        assert_eq!(route.path(), "/channels/42/messages");

        let route = Route::DeleteMessage {
            channel_id: "42".into(),
            message_id: "7".into(),
        };
        assert_eq!(route.method(), Method::DELETE);
        assert_eq!(route.path(), "/channels/42/messages/7");

        assert_eq!(Route::CreateDm.path(), "/users/@me/channels");
        assert_eq!(Route::CreateDm.method(), Method::POST);
    }

    #[test]
    fn paging_queries() {
        let route = Route::GetChannelMessages {
            channel_id: "42".into(),
            before: Some("100".into()),
            limit: 50,
        };
        assert_eq!(route.path(), "/channels/42/messages?limit=50&before=100");

        let route = Route::GetGuildMembers {
            guild_id: "g".into(),
            after: None,
            limit: 1000,
        };
        assert_eq!(route.path(), "/guilds/g/members?limit=1000");
    }

    #[test]
    fn buckets_keep_major_parameter() {
        let a = Route::EditMessage {
            channel_id: "1".into(),
            message_id: "10".into(),
        };
        let b = Route::EditMessage {
            channel_id: "1".into(),
            message_id: "11".into(),
        };
        let c = Route::EditMessage {
            channel_id: "2".into(),
            message_id: "10".into(),
        };
        assert_eq!(a.bucket(), b.bucket());
        assert_ne!(a.bucket(), c.bucket());
        assert_eq!(a.bucket(), "PATCH /channels/1/messages/:id");

        let user = Route::GetUser {
            user_id: "5".into(),
        };
        assert_eq!(user.bucket(), "GET /users/:id");
    }
}
