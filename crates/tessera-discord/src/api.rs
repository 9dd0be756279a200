//! Typed Discord REST API.
//!
//! Each method maps to one [`Route`] and decodes the response into the
//! matching wire type from [`crate::types`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::rest::{Requester, RestResult, Route};
use crate::types::{
    CreateDm, CreateMessage, DiscordChannel, DiscordGuild, DiscordMember, DiscordMessage,
    DiscordUser, EditMessage,
};

/// Largest page Discord returns from the channel history endpoint.
pub const MESSAGE_PAGE_LIMIT: u8 = 100;
/// Largest page Discord returns from the guild member list endpoint.
pub const MEMBER_PAGE_LIMIT: u16 = 1000;

/// Thin typed wrapper around a [`Requester`].
#[derive(Clone)]
pub struct DiscordApi {
    requester: Arc<dyn Requester>,
}

impl DiscordApi {
    /// Wrap a requester.
    #[must_use]
    pub fn new(requester: Arc<dyn Requester>) -> Self {
        Self { requester }
    }

    async fn call<T: DeserializeOwned>(&self, route: Route, body: Option<Value>) -> RestResult<T> {
        let value = self.requester.request(route, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn call_with<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        route: Route,
        body: &B,
    ) -> RestResult<T> {
        let body = serde_json::to_value(body)?;
        self.call(route, Some(body)).await
    }

    // ── Message Operations ───────────────────────────────────

    /// Post a message to a channel.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn create_message(
        &self,
        channel_id: &str,
        message: &CreateMessage,
    ) -> RestResult<DiscordMessage> {
        let route = Route::CreateMessage {
            channel_id: channel_id.to_owned(),
        };
        self.call_with(route, message).await
    }

    /// Fetch one message.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> RestResult<DiscordMessage> {
        let route = Route::GetMessage {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// Replace a message's content.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        edit: &EditMessage,
    ) -> RestResult<DiscordMessage> {
        let route = Route::EditMessage {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
        };
        self.call_with(route, edit).await
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns the requester's error.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> RestResult<()> {
        let route = Route::DeleteMessage {
            channel_id: channel_id.to_owned(),
            message_id: message_id.to_owned(),
        };
        self.requester.request(route, None).await.map(|_| ())
    }

    /// One page of channel history, newest first as Discord returns it.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_channel_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: u8,
    ) -> RestResult<Vec<DiscordMessage>> {
        let route = Route::GetChannelMessages {
            channel_id: channel_id.to_owned(),
            before: before.map(str::to_owned),
            limit: limit.clamp(1, MESSAGE_PAGE_LIMIT),
        };
        self.call(route, None).await
    }

    // ── Users & Channels ─────────────────────────────────────

    /// Fetch a user.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_user(&self, user_id: &str) -> RestResult<DiscordUser> {
        let route = Route::GetUser {
            user_id: user_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// Fetch a channel.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_channel(&self, channel_id: &str) -> RestResult<DiscordChannel> {
        let route = Route::GetChannel {
            channel_id: channel_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// Open (or fetch the existing) DM channel with a user.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn create_dm(&self, recipient_id: &str) -> RestResult<DiscordChannel> {
        let body = CreateDm {
            recipient_id: recipient_id.to_owned(),
        };
        self.call_with(Route::CreateDm, &body).await
    }

    // ── Guilds ───────────────────────────────────────────────

    /// Fetch a guild.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_guild(&self, guild_id: &str) -> RestResult<DiscordGuild> {
        let route = Route::GetGuild {
            guild_id: guild_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// Guilds the bot is in.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_current_user_guilds(&self) -> RestResult<Vec<DiscordGuild>> {
        self.call(Route::GetCurrentUserGuilds, None).await
    }

    /// Channels of a guild.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_guild_channels(&self, guild_id: &str) -> RestResult<Vec<DiscordChannel>> {
        let route = Route::GetGuildChannels {
            guild_id: guild_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// Fetch one guild member.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> RestResult<DiscordMember> {
        let route = Route::GetGuildMember {
            guild_id: guild_id.to_owned(),
            user_id: user_id.to_owned(),
        };
        self.call(route, None).await
    }

    /// One page of guild members with user ids greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns the requester's error or a decode error.
    pub async fn get_guild_members(
        &self,
        guild_id: &str,
        after: Option<&str>,
        limit: u16,
    ) -> RestResult<Vec<DiscordMember>> {
        let route = Route::GetGuildMembers {
            guild_id: guild_id.to_owned(),
            after: after.map(str::to_owned),
            limit: limit.clamp(1, MEMBER_PAGE_LIMIT),
        };
        self.call(route, None).await
    }

    /// Kick a member from a guild.
    ///
    /// # Errors
    ///
    /// Returns the requester's error.
    pub async fn remove_guild_member(&self, guild_id: &str, user_id: &str) -> RestResult<()> {
        let route = Route::RemoveGuildMember {
            guild_id: guild_id.to_owned(),
            user_id: user_id.to_owned(),
        };
        self.requester.request(route, None).await.map(|_| ())
    }
}

impl std::fmt::Debug for DiscordApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordApi").finish_non_exhaustive()
    }
}
