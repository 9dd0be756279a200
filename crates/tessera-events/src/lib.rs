//! Tessera Events - Host event bus for platform adapters.
//!
//! This crate provides:
//! - The [`TesseraEvent`] envelope for everything an adapter reports
//! - A broadcast-based [`EventBus`] with async receivers
//!
//! # Architecture
//!
//! Adapters publish to an [`EventBus`], which broadcasts each event to every
//! subscriber. Publishing never waits for subscribers: a slow receiver lags
//! and loses the oldest events rather than stalling the gateway read loop.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{Event, EventKind};
//! use tessera_events::{EventBus, EventMetadata, TesseraEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(TesseraEvent::Dispatch {
//!     metadata: EventMetadata::new("discord"),
//!     event: Event::new(EventKind::Send, "bot-1"),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "send");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{ConnectionState, EventMetadata, TesseraEvent};
