//! Gateway intent flags.

use tessera_config::IntentsSection;

/// Bitmask of subscribed gateway event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Intents(u32);

impl Intents {
    /// Guild create/update/delete, roles and channels.
    pub const GUILDS: Self = Self(1 << 0);
    /// Member add/update/remove. Privileged.
    pub const GUILD_MEMBERS: Self = Self(1 << 1);
    /// Presence updates. Privileged.
    pub const GUILD_PRESENCES: Self = Self(1 << 8);
    /// Messages in guild channels.
    pub const GUILD_MESSAGES: Self = Self(1 << 9);
    /// Reactions in guild channels.
    pub const GUILD_MESSAGE_REACTIONS: Self = Self(1 << 10);
    /// Direct messages.
    pub const DIRECT_MESSAGES: Self = Self(1 << 12);
    /// Reactions in direct messages.
    pub const DIRECT_MESSAGE_REACTIONS: Self = Self(1 << 13);
    /// Message content in guild messages. Privileged.
    pub const MESSAGE_CONTENT: Self = Self(1 << 15);

    /// Intents every session subscribes to.
    pub const BASE: Self = Self(
        Self::GUILDS.0
            | Self::GUILD_MESSAGES.0
            | Self::GUILD_MESSAGE_REACTIONS.0
            | Self::DIRECT_MESSAGES.0
            | Self::DIRECT_MESSAGE_REACTIONS.0
            | Self::MESSAGE_CONTENT.0,
    );

    /// Create from a raw bitmask.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bitmask sent in identify.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Base set plus the privileged opt-ins enabled in config.
    #[must_use]
    pub fn from_config(section: &IntentsSection) -> Self {
        let mut intents = Self::BASE;
        if section.members {
            intents = intents | Self::GUILD_MEMBERS;
        }
        if section.presence {
            intents = intents | Self::GUILD_PRESENCES;
        }
        intents
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::from_config(&IntentsSection::default())
    }
}

impl std::ops::BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
