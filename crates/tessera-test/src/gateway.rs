//! In-memory gateway transport.
//!
//! [`MockConnector`] hands the session manager an in-memory stream per
//! connection and publishes the other end as a [`MockPeer`]. The peer plays
//! the Discord side: it pushes frames, close codes and errors to the client
//! and reads back everything the client sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tessera_discord::gateway::{Connector, GatewayError, GatewayResult, GatewayStream};
use tokio::sync::mpsc;

/// Something the peer delivers to the client.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A text frame.
    Text(String),
    /// A close frame with this code.
    Close(u16),
    /// A transport error.
    Error(String),
    /// The stream ends without a close frame.
    Eof,
}

/// Scripted [`Connector`].
#[derive(Debug)]
pub struct MockConnector {
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPeer>>,
    urls: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<String>>,
    connects: AtomicUsize,
    auto_ack: Arc<AtomicBool>,
}

impl MockConnector {
    /// Connector whose streams acknowledge heartbeats automatically.
    #[must_use]
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            peers_tx,
            peers_rx: tokio::sync::Mutex::new(peers_rx),
            urls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
            auto_ack: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Connector whose streams never acknowledge heartbeats on their own.
    #[must_use]
    pub fn without_auto_ack() -> Self {
        let connector = Self::new();
        connector.set_auto_ack(false);
        connector
    }

    /// Toggle automatic heartbeat ACKs for all current and future streams.
    pub fn set_auto_ack(&self, enabled: bool) {
        self.auto_ack.store(enabled, Ordering::SeqCst);
    }

    /// Make the next connection attempt fail with a transport error.
    pub fn fail_next(&self, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(message.into());
        }
    }

    /// Wait for the next successful connection.
    pub async fn next_peer(&self) -> Option<MockPeer> {
        self.peers_rx.lock().await.recv().await
    }

    /// Number of connection attempts, including failed ones.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// URLs of every connection attempt, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> GatewayResult<Box<dyn GatewayStream>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_owned());
        }
        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(message) = failure {
            return Err(GatewayError::Transport(message));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Mutex::new(None));

        let stream = MockStream {
            inbound: inbound_rx,
            ack: inbound_tx.downgrade(),
            sent: sent_tx,
            closed: Arc::clone(&closed),
            auto_ack: Arc::clone(&self.auto_ack),
        };
        let peer = MockPeer {
            url: url.to_owned(),
            inbound: inbound_tx,
            sent: sent_rx,
            closed,
        };
        // The test may have stopped listening; the stream still works.
        let _ = self.peers_tx.send(peer);
        Ok(Box::new(stream))
    }
}

/// Client end of a mock connection.
struct MockStream {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    /// Weak so that dropping the peer ends the stream.
    ack: mpsc::WeakUnboundedSender<Inbound>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<Mutex<Option<u16>>>,
    auto_ack: Arc<AtomicBool>,
}

#[async_trait]
impl GatewayStream for MockStream {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        let is_heartbeat = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("op").and_then(Value::as_u64))
            == Some(1);
        self.sent
            .send(text)
            .map_err(|_| GatewayError::Transport("peer gone".into()))?;
        if is_heartbeat
            && self.auto_ack.load(Ordering::SeqCst)
            && let Some(ack) = self.ack.upgrade()
        {
            let _ = ack.send(Inbound::Text(r#"{"op":11}"#.to_owned()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> GatewayResult<Option<String>> {
        match self.inbound.recv().await {
            Some(Inbound::Text(text)) => Ok(Some(text)),
            Some(Inbound::Close(code)) => Err(GatewayError::Closed(code)),
            Some(Inbound::Error(message)) => Err(GatewayError::Transport(message)),
            Some(Inbound::Eof) | None => Ok(None),
        }
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        if let Ok(mut closed) = self.closed.lock()
            && closed.is_none()
        {
            *closed = Some(code);
        }
        Ok(())
    }
}

/// Server end of a mock connection.
#[derive(Debug)]
pub struct MockPeer {
    /// URL the client connected to.
    pub url: String,
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<Mutex<Option<u16>>>,
}

impl MockPeer {
    /// Deliver something to the client. Ignored if the client hung up.
    pub fn push(&self, inbound: Inbound) {
        let _ = self.inbound.send(inbound);
    }

    /// Deliver a JSON payload as a text frame.
    pub fn send_json(&self, payload: &Value) {
        self.push(Inbound::Text(payload.to_string()));
    }

    /// Deliver Hello with the given heartbeat interval.
    pub fn hello(&self, heartbeat_interval: u64) {
        self.send_json(&crate::fixtures::hello(heartbeat_interval));
    }

    /// Close the connection from the server side with `code`.
    pub fn close(&self, code: u16) {
        self.push(Inbound::Close(code));
    }

    /// Next frame the client sent, decoded as JSON. `None` once the client
    /// dropped the connection and every frame has been read.
    pub async fn next_sent(&mut self) -> Option<Value> {
        loop {
            let text = self.sent.recv().await?;
            if let Ok(value) = serde_json::from_str(&text) {
                return Some(value);
            }
        }
    }

    /// Next frame the client sent with opcode `op`, skipping others.
    pub async fn next_sent_op(&mut self, op: u64) -> Option<Value> {
        loop {
            let value = self.next_sent().await?;
            if value.get("op").and_then(Value::as_u64) == Some(op) {
                return Some(value);
            }
        }
    }

    /// Every frame the client has sent so far that has not been read yet.
    pub fn drain_sent(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            if let Ok(value) = serde_json::from_str(&text) {
                out.push(value);
            }
        }
        out
    }

    /// Close code the client sent, if it has closed the connection.
    #[must_use]
    pub fn closed_with(&self) -> Option<u16> {
        self.closed.lock().ok().and_then(|closed| *closed)
    }
}
