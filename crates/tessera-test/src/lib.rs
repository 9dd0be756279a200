//! Tessera Test - Shared test utilities for Tessera crates.
//!
//! This crate provides in-memory transports and fixtures for exercising the
//! Discord adapter without a network:
//!
//! - [`MockConnector`] / [`MockPeer`]: a scripted gateway. Each connection
//!   the session manager opens shows up as a [`MockPeer`] the test drives.
//! - [`MockRequester`]: records REST calls and replays scripted replies.
//! - [`fixtures`]: gateway payloads and Discord objects as JSON.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tessera-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! let connector = Arc::new(MockConnector::new());
//! let (session, handle) = GatewaySession::new(config, connector.clone(), bus);
//! tokio::spawn(session.run());
//!
//! let mut peer = connector.next_peer().await.unwrap();
//! peer.hello(45_000);
//! let identify = peer.next_sent_op(2).await.unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod gateway;
pub mod harness;
pub mod rest;

pub use gateway::{Inbound, MockConnector, MockPeer};
pub use harness::{setup_test_logging, setup_test_logging_default};
pub use rest::{MockReply, MockRequester, RecordedCall};
