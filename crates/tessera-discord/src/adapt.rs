//! Discord payloads → normalized entities and events.
//!
//! Every function here is pure. Message content is decoded from Discord's
//! inline syntax (`<@id>`, `<#id>`, `<:name:id>`, ...) into markup so hosts
//! see the same segment chain on every platform.

use std::sync::LazyLock;

use regex::Regex;
use tessera_core::element::{self, Element, Mention};
use tessera_core::{
    Channel, ChannelKind, Event, EventKind, Guild, GuildMember, GuildRole, Message, Subtype, User,
};

use crate::gateway::DispatchEvent;
use crate::types::{
    DiscordChannel, DiscordEmoji, DiscordGuild, DiscordInteraction, DiscordMember, DiscordMessage,
    DiscordRole, DiscordUser, ReactionPayload, channel_type, interaction_type,
};

const CDN: &str = "https://cdn.discordapp.com";

/// Matches every inline token Discord renders specially.
static INLINE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"<@!?(?P<user>\d+)>",
        r"|<@&(?P<role>\d+)>",
        r"|<#(?P<channel>\d+)>",
        r"|<(?P<animated>a?):(?P<name>\w+):(?P<emoji>\d+)>",
        r"|@(?P<mass>everyone|here)",
    ))
    .expect("invalid regex")
});

/// Normalize a Discord user.
#[must_use]
pub fn adapt_user(user: &DiscordUser) -> User {
    User {
        id: user.id.clone(),
        name: user.username.clone(),
        nick: user.global_name.clone(),
        avatar: user
            .avatar
            .as_ref()
            .map(|hash| format!("{CDN}/avatars/{}/{hash}.png", user.id)),
        is_bot: user.bot,
    }
}

/// Normalize a guild.
#[must_use]
pub fn adapt_guild(guild: &DiscordGuild) -> Guild {
    Guild {
        id: guild.id.clone(),
        name: guild.name.clone(),
        avatar: guild
            .icon
            .as_ref()
            .map(|hash| format!("{CDN}/icons/{}/{hash}.png", guild.id)),
    }
}

/// Normalize a channel.
#[must_use]
pub fn adapt_channel(channel: &DiscordChannel) -> Channel {
    let kind = match channel.kind {
        channel_type::DM | channel_type::GROUP_DM => ChannelKind::Direct,
        channel_type::GUILD_CATEGORY => ChannelKind::Category,
        channel_type::GUILD_VOICE | channel_type::GUILD_STAGE_VOICE => ChannelKind::Voice,
        _ => ChannelKind::Text,
    };
    let name = channel.name.clone().or_else(|| {
        // Unnamed DM channels take the recipient's name.
        channel.recipients.first().map(|u| u.username.clone())
    });
    Channel {
        id: channel.id.clone(),
        name,
        kind,
        parent_id: channel.parent_id.clone(),
    }
}

/// Normalize a guild member.
#[must_use]
pub fn adapt_member(member: &DiscordMember) -> GuildMember {
    let user = member.user.as_ref().map(adapt_user);
    GuildMember {
        avatar: user.as_ref().and_then(|u| u.avatar.clone()),
        user,
        nick: member.nick.clone(),
        joined_at: member.joined_at.as_deref().and_then(parse_timestamp),
    }
}

/// Normalize a role.
#[must_use]
pub fn adapt_role(role: &DiscordRole) -> GuildRole {
    GuildRole {
        id: role.id.clone(),
        name: role.name.clone(),
        color: role.color,
        position: role.position,
        permissions: role.permissions.clone(),
        hoist: role.hoist,
        mentionable: role.mentionable,
    }
}

/// Normalize a message, decoding its content and attachments into markup.
///
/// A `referenced_message` becomes [`Message::quote`].
#[must_use]
pub fn adapt_message(message: &DiscordMessage) -> Message {
    let mut elements = decode_content(&message.content);
    for attachment in &message.attachments {
        if attachment.is_image() {
            elements.push(Element::image(&attachment.url));
        } else {
            elements.push(Element::Node {
                tag: "file".to_owned(),
                attrs: vec![
                    ("src".to_owned(), attachment.url.clone()),
                    ("title".to_owned(), attachment.filename.clone()),
                ],
                children: Vec::new(),
            });
        }
    }

    let user = message.author.as_ref().map(adapt_user);
    let member = message.member.as_ref().map(|m| {
        let mut member = adapt_member(m);
        // Message members omit the user; it is the author.
        if member.user.is_none() {
            member.avatar = user.as_ref().and_then(|u| u.avatar.clone());
            member.user = user.clone();
        }
        member
    });

    Message {
        id: message.id.clone(),
        content: element::serialize(&elements),
        elements,
        timestamp: message.timestamp.as_deref().and_then(parse_timestamp),
        updated_at: message.edited_timestamp.as_deref().and_then(parse_timestamp),
        user,
        member,
        channel: Some(message_channel(&message.channel_id, message.guild_id.as_deref())),
        guild: message.guild_id.as_deref().map(Guild::with_id),
        quote: message
            .referenced_message
            .as_deref()
            .map(|quoted| Box::new(adapt_message(quoted))),
    }
}

/// Build a message event carrying the message, its author, channel and
/// guild.
#[must_use]
pub fn adapt_message_event(kind: EventKind, message: &DiscordMessage, self_id: &str) -> Event {
    let adapted = adapt_message(message);
    let mut event = Event::new(kind, self_id);
    event.subtype = Some(subtype_for(message.guild_id.as_deref()));
    event.user.clone_from(&adapted.user);
    event.member.clone_from(&adapted.member);
    event.channel.clone_from(&adapted.channel);
    event.guild.clone_from(&adapted.guild);
    event.message = Some(adapted);
    event
}

/// Turn a dispatch into a normalized event.
///
/// Returns `None` for handshake and unknown dispatches, guild outages and
/// interactions other than application commands.
#[must_use]
pub fn adapt_dispatch(event: DispatchEvent, self_id: &str) -> Option<Event> {
    let adapted = match event {
        DispatchEvent::Ready(_) | DispatchEvent::Resumed(_) | DispatchEvent::Unknown => {
            return None;
        },
        DispatchEvent::MessageCreate(msg) => {
            adapt_message_event(EventKind::MessageCreated, &msg, self_id)
        },
        DispatchEvent::MessageUpdate(msg) => {
            adapt_message_event(EventKind::MessageUpdated, &msg, self_id)
        },
        DispatchEvent::MessageDelete(payload) => {
            let mut event = Event::new(EventKind::MessageDeleted, self_id);
            event.subtype = Some(subtype_for(payload.guild_id.as_deref()));
            event.channel = Some(message_channel(
                &payload.channel_id,
                payload.guild_id.as_deref(),
            ));
            event.guild = payload.guild_id.as_deref().map(Guild::with_id);
            event.message = Some(Message {
                id: payload.id,
                ..Message::default()
            });
            event
        },
        DispatchEvent::GuildCreate(guild) => guild_event(EventKind::GuildAdded, &guild, self_id),
        DispatchEvent::GuildUpdate(guild) => guild_event(EventKind::GuildUpdated, &guild, self_id),
        DispatchEvent::GuildDelete(guild) => {
            if guild.unavailable {
                return None;
            }
            let mut event = Event::new(EventKind::GuildRemoved, self_id);
            event.guild = Some(Guild::with_id(guild.id));
            event
        },
        DispatchEvent::GuildMemberAdd(payload) => member_event(
            EventKind::GuildMemberAdded,
            &payload.guild_id,
            &payload.member,
            self_id,
        ),
        DispatchEvent::GuildMemberUpdate(payload) => member_event(
            EventKind::GuildMemberUpdated,
            &payload.guild_id,
            &payload.member,
            self_id,
        ),
        DispatchEvent::GuildMemberRemove(payload) => {
            let mut event = Event::new(EventKind::GuildMemberRemoved, self_id);
            event.guild = Some(Guild::with_id(payload.guild_id));
            event.user = Some(adapt_user(&payload.user));
            event
        },
        DispatchEvent::GuildRoleCreate(payload) => role_event(
            EventKind::GuildRoleCreated,
            payload.guild_id,
            adapt_role(&payload.role),
            self_id,
        ),
        DispatchEvent::GuildRoleUpdate(payload) => role_event(
            EventKind::GuildRoleUpdated,
            payload.guild_id,
            adapt_role(&payload.role),
            self_id,
        ),
        DispatchEvent::GuildRoleDelete(payload) => {
            let role = GuildRole {
                id: payload.role_id,
                ..GuildRole::default()
            };
            role_event(EventKind::GuildRoleDeleted, payload.guild_id, role, self_id)
        },
        DispatchEvent::ChannelCreate(channel) => {
            channel_event(EventKind::ChannelAdded, &channel, self_id)
        },
        DispatchEvent::ChannelUpdate(channel) => {
            channel_event(EventKind::ChannelUpdated, &channel, self_id)
        },
        DispatchEvent::ChannelDelete(channel) => {
            channel_event(EventKind::ChannelRemoved, &channel, self_id)
        },
        DispatchEvent::MessageReactionAdd(payload) => {
            reaction_event(EventKind::ReactionAdded, payload, self_id)
        },
        DispatchEvent::MessageReactionRemove(payload) => {
            reaction_event(EventKind::ReactionRemoved, payload, self_id)
        },
        DispatchEvent::InteractionCreate(interaction) => {
            return interaction_event(interaction, self_id);
        },
    };
    Some(adapted)
}

/// Decode Discord message content into a segment chain.
///
/// `<@id>` and `<@!id>` become user mentions, `<@&id>` role mentions,
/// `@everyone`/`@here` mass mentions, `<#id>` channel references and custom
/// emoji `<:name:id>` become `face` nodes. Everything else is text.
#[must_use]
pub fn decode_content(content: &str) -> Vec<Element> {
    let mut chain = Vec::new();
    let mut last = 0;

    for caps in INLINE_TOKEN.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            chain.push(Element::text(&content[last..whole.start()]));
        }
        last = whole.end();

        let element = if let Some(id) = caps.name("user") {
            Element::at(id.as_str())
        } else if let Some(id) = caps.name("role") {
            Element::At {
                target: Mention::Role(id.as_str().to_owned()),
            }
        } else if let Some(id) = caps.name("channel") {
            Element::Sharp {
                id: id.as_str().to_owned(),
            }
        } else if let Some(id) = caps.name("emoji") {
            let name = caps.name("name").map_or("", |m| m.as_str());
            let mut attrs = vec![
                ("id".to_owned(), id.as_str().to_owned()),
                ("name".to_owned(), name.to_owned()),
            ];
            if caps.name("animated").is_some_and(|m| !m.as_str().is_empty()) {
                attrs.push(("animated".to_owned(), "true".to_owned()));
            }
            Element::Node {
                tag: "face".to_owned(),
                attrs,
                children: Vec::new(),
            }
        } else {
            let target = match caps.name("mass").map(|m| m.as_str()) {
                Some("here") => Mention::Here,
                _ => Mention::Everyone,
            };
            Element::At { target }
        };
        chain.push(element);
    }

    if last < content.len() {
        chain.push(Element::text(&content[last..]));
    }
    chain
}

fn parse_timestamp(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn subtype_for(guild_id: Option<&str>) -> Subtype {
    if guild_id.is_some() {
        Subtype::Group
    } else {
        Subtype::Direct
    }
}

/// Channel stub for a message. Messages outside a guild are DMs.
fn message_channel(channel_id: &str, guild_id: Option<&str>) -> Channel {
    let kind = if guild_id.is_some() {
        ChannelKind::Text
    } else {
        ChannelKind::Direct
    };
    Channel::with_id(channel_id, kind)
}

fn guild_event(kind: EventKind, guild: &DiscordGuild, self_id: &str) -> Event {
    let mut event = Event::new(kind, self_id);
    event.guild = Some(adapt_guild(guild));
    event
}

fn member_event(kind: EventKind, guild_id: &str, member: &DiscordMember, self_id: &str) -> Event {
    let member = adapt_member(member);
    let mut event = Event::new(kind, self_id);
    event.guild = Some(Guild::with_id(guild_id));
    event.user.clone_from(&member.user);
    event.member = Some(member);
    event
}

fn role_event(kind: EventKind, guild_id: String, role: GuildRole, self_id: &str) -> Event {
    let mut event = Event::new(kind, self_id);
    event.guild = Some(Guild::with_id(guild_id));
    event.role = Some(role);
    event
}

fn channel_event(kind: EventKind, channel: &DiscordChannel, self_id: &str) -> Event {
    let mut event = Event::new(kind, self_id);
    event.guild = channel.guild_id.as_deref().map(Guild::with_id);
    event.channel = Some(adapt_channel(channel));
    event
}

fn reaction_event(kind: EventKind, payload: ReactionPayload, self_id: &str) -> Event {
    let member = payload.member.as_ref().map(adapt_member);
    let user = member
        .as_ref()
        .and_then(|m| m.user.clone())
        .unwrap_or_else(|| User::new(&payload.user_id, ""));

    let mut event = Event::new(kind, self_id);
    event.subtype = Some(subtype_for(payload.guild_id.as_deref()));
    event.user = Some(user);
    event.member = member;
    event.channel = Some(message_channel(
        &payload.channel_id,
        payload.guild_id.as_deref(),
    ));
    event.guild = payload.guild_id.as_deref().map(Guild::with_id);
    event.message = Some(Message {
        id: payload.message_id,
        ..Message::default()
    });
    event.emoji = emoji_name(&payload.emoji);
    event
}

/// `name:id` for custom emoji, the character itself for unicode emoji.
fn emoji_name(emoji: &DiscordEmoji) -> Option<String> {
    match (&emoji.name, &emoji.id) {
        (Some(name), Some(id)) => Some(format!("{name}:{id}")),
        (Some(name), None) => Some(name.clone()),
        (None, Some(id)) => Some(id.clone()),
        (None, None) => None,
    }
}

fn interaction_event(interaction: DiscordInteraction, self_id: &str) -> Option<Event> {
    if interaction.kind != interaction_type::APPLICATION_COMMAND {
        return None;
    }
    let member = interaction.member.as_ref().map(adapt_member);
    let user = member
        .as_ref()
        .and_then(|m| m.user.clone())
        .or_else(|| interaction.user.as_ref().map(adapt_user));

    let mut event = Event::new(EventKind::InteractionCommand, self_id);
    event.subtype = Some(subtype_for(interaction.guild_id.as_deref()));
    event.user = user;
    event.member = member;
    event.channel = interaction
        .channel_id
        .as_deref()
        .map(|id| message_channel(id, interaction.guild_id.as_deref()));
    event.guild = interaction.guild_id.as_deref().map(Guild::with_id);
    event.raw = interaction.data;
    Some(event)
}
