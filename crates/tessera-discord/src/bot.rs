//! Host-facing Discord bot.
//!
//! [`DiscordBot`] ties the pieces together: a [`GatewaySession`] for inbound
//! events, a [`MessageDispatcher`] for outbound messages and the typed
//! [`DiscordApi`] for lookups. Results are returned as normalized entities.

use std::sync::Arc;

use tessera_config::Config;
use tessera_core::{Channel, Guild, GuildMember, Message, User};
use tessera_events::EventBus;
use tracing::info;

use crate::adapt;
use crate::api::{DiscordApi, MEMBER_PAGE_LIMIT, MESSAGE_PAGE_LIMIT};
use crate::dispatch::MessageDispatcher;
use crate::error::{DiscordError, DiscordResult};
use crate::gateway::{Connector, GatewayConfig, GatewaySession, SessionHandle, WsConnector};
use crate::rest::{HttpRequester, Requester};

/// A Discord bot account connected to a host [`EventBus`].
pub struct DiscordBot {
    api: DiscordApi,
    dispatcher: MessageDispatcher,
    handle: SessionHandle,
}

impl DiscordBot {
    /// Build a bot from loaded configuration using the WebSocket and HTTP
    /// transports. The returned session must be driven with
    /// [`GatewaySession::run`] for inbound events to flow.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::MissingToken`] without a token, or
    /// [`DiscordError::Rest`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config, bus: EventBus) -> DiscordResult<(Self, GatewaySession)> {
        let gateway = GatewayConfig::from_config(config).ok_or(DiscordError::MissingToken)?;
        let requester = HttpRequester::from_config(&config.discord, &gateway.token)?;
        info!(
            gateway = %gateway.gateway_url,
            endpoint = %config.discord.endpoint,
            intents = gateway.intents.bits(),
            "Discord bot configured"
        );
        Ok(Self::with_transports(
            gateway,
            Arc::new(WsConnector),
            Arc::new(requester),
            bus,
        ))
    }

    /// Build a bot over explicit transports.
    #[must_use]
    pub fn with_transports(
        gateway: GatewayConfig,
        connector: Arc<dyn Connector>,
        requester: Arc<dyn Requester>,
        bus: EventBus,
    ) -> (Self, GatewaySession) {
        let (session, handle) = GatewaySession::new(gateway, connector, bus.clone());
        let api = DiscordApi::new(requester);
        let dispatcher = MessageDispatcher::new(api.clone(), bus, handle.watch_self_user());
        let bot = Self {
            api,
            dispatcher,
            handle,
        };
        (bot, session)
    }

    /// Handle to the gateway session.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.handle
    }

    /// The bot's own user, once the gateway is ready.
    #[must_use]
    pub fn self_user(&self) -> Option<User> {
        self.handle.self_user()
    }

    // ── Messages ─────────────────────────────────────────────

    /// Send markup to a channel. See [`MessageDispatcher::send`].
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Dispatch`] on failure.
    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        guild_id: Option<&str>,
    ) -> DiscordResult<Vec<String>> {
        Ok(self.dispatcher.send(channel_id, content, guild_id).await?)
    }

    /// Send markup to a user by direct message.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Dispatch`] on failure.
    pub async fn send_private_message(
        &self,
        user_id: &str,
        content: &str,
    ) -> DiscordResult<Vec<String>> {
        Ok(self.dispatcher.send_private(user_id, content).await?)
    }

    /// Replace a message's content.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Dispatch`] for image or oversized content and
    /// on REST failure.
    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> DiscordResult<()> {
        Ok(self.dispatcher.edit(channel_id, message_id, content).await?)
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Dispatch`] on REST failure.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> DiscordResult<()> {
        Ok(self.dispatcher.delete(channel_id, message_id).await?)
    }

    /// Fetch one message.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> DiscordResult<Message> {
        let message = self.api.get_message(channel_id, message_id).await?;
        Ok(adapt::adapt_message(&message))
    }

    /// One page of channel history before `before` (or the latest page),
    /// ordered oldest to newest.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_message_list(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> DiscordResult<Vec<Message>> {
        let page = self
            .api
            .get_channel_messages(channel_id, before, MESSAGE_PAGE_LIMIT)
            .await?;
        Ok(page.iter().rev().map(adapt::adapt_message).collect())
    }

    // ── Users & Channels ─────────────────────────────────────

    /// Fetch a user.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_user(&self, user_id: &str) -> DiscordResult<User> {
        let user = self.api.get_user(user_id).await?;
        Ok(adapt::adapt_user(&user))
    }

    /// Fetch a channel.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_channel(&self, channel_id: &str) -> DiscordResult<Channel> {
        let channel = self.api.get_channel(channel_id).await?;
        Ok(adapt::adapt_channel(&channel))
    }

    /// Channels of a guild.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_channel_list(&self, guild_id: &str) -> DiscordResult<Vec<Channel>> {
        let channels = self.api.get_guild_channels(guild_id).await?;
        Ok(channels.iter().map(adapt::adapt_channel).collect())
    }

    // ── Guilds ───────────────────────────────────────────────

    /// Fetch a guild.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_guild(&self, guild_id: &str) -> DiscordResult<Guild> {
        let guild = self.api.get_guild(guild_id).await?;
        Ok(adapt::adapt_guild(&guild))
    }

    /// Guilds the bot is in.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_guild_list(&self) -> DiscordResult<Vec<Guild>> {
        let guilds = self.api.get_current_user_guilds().await?;
        Ok(guilds.iter().map(adapt::adapt_guild).collect())
    }

    /// Fetch one guild member.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> DiscordResult<GuildMember> {
        let member = self.api.get_guild_member(guild_id, user_id).await?;
        Ok(adapt::adapt_member(&member))
    }

    /// One page of guild members with user ids after `after`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn get_guild_member_list(
        &self,
        guild_id: &str,
        after: Option<&str>,
    ) -> DiscordResult<Vec<GuildMember>> {
        let members = self
            .api
            .get_guild_members(guild_id, after, MEMBER_PAGE_LIMIT)
            .await?;
        Ok(members.iter().map(adapt::adapt_member).collect())
    }

    /// Remove a member from a guild.
    ///
    /// # Errors
    ///
    /// Returns [`DiscordError::Rest`] on failure.
    pub async fn kick_guild_member(&self, guild_id: &str, user_id: &str) -> DiscordResult<()> {
        self.api.remove_guild_member(guild_id, user_id).await?;
        Ok(())
    }
}

impl std::fmt::Debug for DiscordBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordBot")
            .field("state", &self.handle.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_rejected() {
        let config = Config::default();
        let err = DiscordBot::from_config(&config, EventBus::new()).unwrap_err();
        assert!(matches!(err, DiscordError::MissingToken));
    }

    #[tokio::test]
    async fn configured_bot_starts_disconnected() {
        let mut config = Config::default();
        config.discord.token = Some("T".into());
        let (bot, _session) = DiscordBot::from_config(&config, EventBus::new()).unwrap();
        assert_eq!(
            bot.session().state(),
            tessera_events::ConnectionState::Disconnected
        );
        assert!(bot.self_user().is_none());
    }
}
