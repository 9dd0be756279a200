//! Outbound message dispatch.
//!
//! [`MessageDispatcher::send`] turns markup into one or more create-message
//! calls, issued strictly in order. A `send` event is published for every
//! produced message id, but only once the whole request has succeeded. A
//! failure part-way returns the ids already delivered; nothing is retried.

use dashmap::DashMap;
use tessera_core::element::{self, Element};
use tessera_core::{Channel, ChannelKind, Event, EventKind, Guild, Message, Subtype, User};
use tessera_events::{EventBus, EventMetadata, TesseraEvent};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::DiscordApi;
use crate::encode::{self, MAX_CONTENT_CHARS};
use crate::rest::RestError;
use crate::types::EditMessage;

const EVENT_SOURCE: &str = "discord-dispatch";

/// Errors from outbound dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A create-message call failed after `delivered.len()` of `pieces`
    /// pieces had been posted.
    #[error("sent {} of {pieces} pieces: {source}", .delivered.len())]
    Partial {
        /// Ids of the pieces that were posted, in order.
        delivered: Vec<String>,
        /// Number of pieces the request was split into.
        pieces: usize,
        /// The failing call's error.
        source: RestError,
    },

    /// The request cannot be expressed as the requested operation. No call
    /// was made.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A single REST call failed.
    #[error(transparent)]
    Rest(#[from] RestError),
}

/// Result alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Sends, edits and deletes messages on behalf of the host.
pub struct MessageDispatcher {
    api: DiscordApi,
    bus: EventBus,
    self_user: watch::Receiver<Option<User>>,
    /// Recipient user id → DM channel id.
    dm_channels: DashMap<String, String>,
}

impl MessageDispatcher {
    /// Create a dispatcher. `self_user` supplies the bot identity stamped on
    /// `send` events.
    #[must_use]
    pub fn new(api: DiscordApi, bus: EventBus, self_user: watch::Receiver<Option<User>>) -> Self {
        Self {
            api,
            bus,
            self_user,
            dm_channels: DashMap::new(),
        }
    }

    /// Send markup to a channel. Returns the created message ids in order.
    ///
    /// A leading `<quote id=.../>` makes the first message a reply. Content
    /// that is empty after removing the quote sends nothing and returns an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Partial`] if any call fails; the ids posted
    /// before the failure are included.
    pub async fn send(
        &self,
        channel_id: &str,
        content: &str,
        guild_id: Option<&str>,
    ) -> DispatchResult<Vec<String>> {
        let subtype = if guild_id.is_some() {
            Subtype::Group
        } else {
            Subtype::Direct
        };
        self.send_with_subtype(channel_id, content, guild_id, subtype)
            .await
    }

    /// Send markup to a user's DM channel, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Rest`] if the DM channel cannot be opened,
    /// otherwise as [`send`](Self::send).
    pub async fn send_private(&self, user_id: &str, content: &str) -> DispatchResult<Vec<String>> {
        let channel_id = self.dm_channel(user_id).await?;
        self.send_with_subtype(&channel_id, content, None, Subtype::Direct)
            .await
    }

    /// Replace a message's content.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Precondition`] before any call if the new
    /// content contains an image, is empty, or would not fit in one message.
    pub async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> DispatchResult<()> {
        let mut chain = element::parse(content);
        // A reply target cannot be changed by an edit.
        let _ = element::take_leading_quote(&mut chain);

        if element::contains_image(&chain) {
            return Err(DispatchError::Precondition(
                "edited content cannot contain images".into(),
            ));
        }
        let rendered = encode::render(&chain).content;
        if rendered.trim().is_empty() {
            return Err(DispatchError::Precondition(
                "edited content cannot be empty".into(),
            ));
        }
        let chars = rendered.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(DispatchError::Precondition(format!(
                "edited content is {chars} characters, limit is {MAX_CONTENT_CHARS}"
            )));
        }

        self.api
            .edit_message(channel_id, message_id, &EditMessage { content: rendered })
            .await?;
        Ok(())
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Rest`] on failure.
    pub async fn delete(&self, channel_id: &str, message_id: &str) -> DispatchResult<()> {
        self.api.delete_message(channel_id, message_id).await?;
        Ok(())
    }

    async fn dm_channel(&self, user_id: &str) -> DispatchResult<String> {
        if let Some(id) = self.dm_channels.get(user_id) {
            return Ok(id.clone());
        }
        let channel = self.api.create_dm(user_id).await?;
        self.dm_channels.insert(user_id.to_owned(), channel.id.clone());
        Ok(channel.id)
    }

    async fn send_with_subtype(
        &self,
        channel_id: &str,
        content: &str,
        guild_id: Option<&str>,
        subtype: Subtype,
    ) -> DispatchResult<Vec<String>> {
        let mut chain = element::parse(content);
        let reply_to = element::take_leading_quote(&mut chain);
        let pieces = encode::encode(&chain, reply_to.as_deref());
        if pieces.is_empty() {
            debug!(channel_id, "Nothing to send");
            return Ok(Vec::new());
        }

        let total = pieces.len();
        let mut delivered = Vec::with_capacity(total);
        for body in &pieces {
            match self.api.create_message(channel_id, body).await {
                Ok(message) => delivered.push(message.id),
                Err(source) => {
                    warn!(
                        channel_id,
                        delivered = delivered.len(),
                        pieces = total,
                        error = %source,
                        "Send failed part-way"
                    );
                    return Err(DispatchError::Partial {
                        delivered,
                        pieces: total,
                        source,
                    });
                },
            }
        }

        debug!(channel_id, pieces = total, reply_to = ?reply_to, "Message sent");
        self.publish_sent(channel_id, guild_id, subtype, &chain, &delivered);
        Ok(delivered)
    }

    fn publish_sent(
        &self,
        channel_id: &str,
        guild_id: Option<&str>,
        subtype: Subtype,
        chain: &[Element],
        ids: &[String],
    ) {
        let self_user = self.self_user.borrow().clone();
        let self_id = self_user.as_ref().map_or("", |u| u.id.as_str()).to_owned();
        let kind = match subtype {
            Subtype::Direct => ChannelKind::Direct,
            Subtype::Group => ChannelKind::Text,
        };
        let content = element::serialize(chain);

        for id in ids {
            let mut event = Event::new(EventKind::Send, self_id.clone());
            event.subtype = Some(subtype);
            event.user.clone_from(&self_user);
            event.channel = Some(Channel::with_id(channel_id, kind));
            event.guild = guild_id.map(Guild::with_id);
            event.message = Some(Message {
                id: id.clone(),
                content: content.clone(),
                elements: chain.to_vec(),
                user: self_user.clone(),
                ..Message::default()
            });
            self.bus.publish(TesseraEvent::Dispatch {
                metadata: EventMetadata::new(EVENT_SOURCE),
                event,
            });
        }
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("dm_channels", &self.dm_channels.len())
            .finish_non_exhaustive()
    }
}
