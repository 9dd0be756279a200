//! Tessera Core - Normalized chat entities and message markup.
//!
//! This crate provides:
//! - Platform-neutral entity types ([`User`], [`Guild`], [`Channel`],
//!   [`Message`], ...)
//! - The normalized [`Event`] emitted to the host application
//! - The segment chain ([`Element`]) with markup parsing and serialization
//! - Text chunking for platforms with message size limits
//!
//! # Example
//!
//! ```rust
//! use tessera_core::element::{self, Element};
//!
//! let mut chain = element::parse("<quote id=99/>hello &amp; bye");
//! let reply_to = element::take_leading_quote(&mut chain);
//!
//! assert_eq!(reply_to.as_deref(), Some("99"));
//! assert_eq!(chain, vec![Element::text("hello & bye")]);
//! assert_eq!(element::serialize(&chain), "hello &amp; bye");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chunk;
pub mod element;
pub mod entity;
pub mod event;

pub use element::{Element, Mention};
pub use entity::{Channel, ChannelKind, Guild, GuildMember, GuildRole, Message, User};
pub use event::{Event, EventKind, Subtype};

/// Platform name reported on every normalized event.
pub const PLATFORM: &str = "discord";
