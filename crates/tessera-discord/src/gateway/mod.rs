//! Discord Gateway session manager.
//!
//! Keeps one persistent connection to Discord's Gateway: identify or resume,
//! heartbeat, sequence tracking, reconnection with backoff, and publication
//! of adapted dispatch events to the [`EventBus`].
//!
//! # Lifecycle
//!
//! [`GatewaySession::run`] owns the session and the socket. Reads, heartbeats
//! and handshake frames are sequenced by one `select!` loop, so the sequence
//! number has a single writer and no two writes interleave. The host observes
//! and steers the session through a [`SessionHandle`]: connection state and
//! the bot user are published on `watch` channels, reconnect requests arrive
//! through a [`Notify`] and shutdown through a [`CancellationToken`].
//!
//! `run` returns `Ok(())` after shutdown and an error only for fatal
//! conditions (authentication failure, rejected configuration, reconnect
//! limit), after publishing one [`TesseraEvent::Fatal`].

mod backoff;
mod connection;
mod error;
mod event;
mod heartbeat;
mod intents;
pub mod protocol;
mod session;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tessera_config::Config;
use tessera_core::User;
use tessera_events::{ConnectionState, EventBus, EventMetadata, TesseraEvent};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

pub use self::connection::{Connector, GatewayStream, WsConnector};
pub use self::error::{GatewayError, GatewayResult};
pub use self::event::DispatchEvent;
pub use self::intents::Intents;

use self::backoff::Backoff;
use self::heartbeat::{Beat, Heartbeat};
use self::protocol::{CloseAction, GatewayPayload, HelloPayload, close_code, opcode};
use self::session::Session;
use crate::adapt;

/// Timeout for receiving Hello after the transport connects.
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the close frame to be written.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Source tag on events published by the session manager.
const EVENT_SOURCE: &str = "discord-gateway";

// ── Configuration ────────────────────────────────────────────

/// Configuration for a gateway session.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Bot token.
    pub token: String,
    /// Gateway URL without query string.
    pub gateway_url: String,
    /// Intents sent in identify.
    pub intents: Intents,
    /// Base delay for exponential backoff (milliseconds).
    pub backoff_base_ms: u64,
    /// Maximum backoff delay (milliseconds).
    pub backoff_max_ms: u64,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Timeout for opening the transport.
    pub connect_timeout: Duration,
}

impl GatewayConfig {
    /// Configuration with default endpoints and policy for `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            gateway_url: "wss://gateway.discord.gg".to_owned(),
            intents: Intents::default(),
            backoff_base_ms: 1000,
            backoff_max_ms: 60_000,
            max_reconnect_attempts: None,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Build from loaded configuration. Returns `None` when no token is set.
    #[must_use]
    pub fn from_config(config: &Config) -> Option<Self> {
        let token = config.discord.token()?;
        Some(Self {
            token: token.to_owned(),
            gateway_url: config.discord.gateway.clone(),
            intents: Intents::from_config(&config.discord.intents),
            backoff_base_ms: config.reconnect.backoff_base_ms,
            backoff_max_ms: config.reconnect.backoff_max_ms,
            max_reconnect_attempts: config.reconnect.max_attempts,
            connect_timeout: Duration::from_secs(config.discord.timeout_secs),
        })
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"[REDACTED]")
            .field("gateway_url", &self.gateway_url)
            .field("intents", &self.intents)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_max_ms", &self.backoff_max_ms)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// ── Host handle ──────────────────────────────────────────────

/// Signals shared between the session task and its handles.
#[derive(Debug, Default)]
struct Control {
    reconnect: Notify,
    cancel: CancellationToken,
}

/// Host-side handle to a running [`GatewaySession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    control: Arc<Control>,
    state_rx: watch::Receiver<ConnectionState>,
    user_rx: watch::Receiver<Option<User>>,
}

impl SessionHandle {
    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// The bot's own user, known after the first `READY`.
    #[must_use]
    pub fn self_user(&self) -> Option<User> {
        self.user_rx.borrow().clone()
    }

    /// Receiver that observes the bot user.
    #[must_use]
    pub fn watch_self_user(&self) -> watch::Receiver<Option<User>> {
        self.user_rx.clone()
    }

    /// Ask the session to drop the connection and resume on a new one.
    ///
    /// Requests are coalesced: any number of calls while a reconnect is
    /// pending or in flight produce one reconnect, whatever started it. A
    /// request made during the first identify takes effect once the session
    /// is ready.
    pub fn reconnect(&self) {
        self.control.reconnect.notify_one();
    }

    /// Stop the session. The socket is closed and the session discarded.
    pub fn shutdown(&self) {
        self.control.cancel.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.control.cancel.is_cancelled()
    }
}

// ── Session manager ──────────────────────────────────────────

/// What the outer loop does after a connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopAction {
    /// Stop and return `Ok(())`.
    Shutdown,
    /// Open a new connection.
    Reconnect {
        /// Discard the session and identify instead of resuming.
        reidentify: bool,
        /// How long to wait first.
        delay: Delay,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delay {
    Immediate,
    Backoff,
    Fixed(Duration),
}

impl LoopAction {
    const RESUME: Self = Self::Reconnect {
        reidentify: false,
        delay: Delay::Backoff,
    };
}

/// Discord Gateway session manager.
pub struct GatewaySession {
    config: GatewayConfig,
    connector: Arc<dyn Connector>,
    bus: EventBus,
    session: Session,
    backoff: Backoff,
    control: Arc<Control>,
    state_tx: watch::Sender<ConnectionState>,
    user_tx: watch::Sender<Option<User>>,
    /// A reconnect is being carried out; host requests made meanwhile are absorbed.
    reconnect_in_flight: bool,
}

impl GatewaySession {
    /// Create a session and its host handle. Does not connect yet.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn Connector>,
        bus: EventBus,
    ) -> (Self, SessionHandle) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (user_tx, user_rx) = watch::channel(None);
        let control = Arc::new(Control::default());
        let handle = SessionHandle {
            control: Arc::clone(&control),
            state_rx,
            user_rx,
        };
        let session = Self {
            backoff: Backoff::new(
                config.backoff_base_ms,
                config.backoff_max_ms,
                config.max_reconnect_attempts,
            ),
            config,
            connector,
            bus,
            session: Session::default(),
            control,
            state_tx,
            user_tx,
            reconnect_in_flight: false,
        };
        (session, handle)
    }

    /// Run until shutdown or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AuthenticationFailed`],
    /// [`GatewayError::InvalidConfiguration`] or
    /// [`GatewayError::ReconnectLimit`]. Transport failures are retried.
    pub async fn run(mut self) -> GatewayResult<()> {
        let result = self.run_loop().await;
        if let Err(err) = &result {
            error!(error = %err, "Fatal Gateway error");
            self.bus.publish(TesseraEvent::Fatal {
                metadata: EventMetadata::new(EVENT_SOURCE),
                message: err.to_string(),
            });
        }
        self.set_state(ConnectionState::Disconnected, None);
        result
    }

    async fn run_loop(&mut self) -> GatewayResult<()> {
        loop {
            if self.control.cancel.is_cancelled() {
                self.session.clear();
                return Ok(());
            }

            let action = match self.connect_and_run().await {
                Ok(action) => action,
                Err(GatewayError::Closed(code)) => self.close_action(code)?,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "Gateway connection failed");
                    LoopAction::RESUME
                },
            };

            match action {
                LoopAction::Shutdown => {
                    info!("Gateway session shut down");
                    self.session.clear();
                    return Ok(());
                },
                LoopAction::Reconnect { reidentify, delay } => {
                    self.reconnect_in_flight = true;
                    if reidentify {
                        self.session.clear();
                    }
                    let wait = match delay {
                        Delay::Immediate => Duration::ZERO,
                        Delay::Fixed(wait) => wait,
                        Delay::Backoff => self.next_backoff()?,
                    };
                    self.set_state(
                        ConnectionState::Reconnecting,
                        Some(if reidentify { "reidentify" } else { "resume" }),
                    );
                    info!(
                        delay_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        attempt = self.backoff.attempt(),
                        reidentify,
                        "Reconnecting to Discord Gateway"
                    );
                    if !self.sleep_or_cancel(wait).await {
                        self.session.clear();
                        return Ok(());
                    }
                },
            }
        }
    }

    fn next_backoff(&mut self) -> GatewayResult<Duration> {
        self.backoff
            .next_delay()
            .map_err(|exhausted| GatewayError::ReconnectLimit(exhausted.limit))
    }

    /// Single connection: connect, handshake, run the event loop, close.
    async fn connect_and_run(&mut self) -> GatewayResult<LoopAction> {
        let control = Arc::clone(&self.control);
        let connector = Arc::clone(&self.connector);
        let url = protocol::with_query(self.session.connect_url(&self.config.gateway_url));

        self.set_state(ConnectionState::Connecting, None);
        info!(url = %url, resume = self.session.can_resume(), "Connecting to Discord Gateway");

        let mut stream = tokio::select! {
            biased;
            () = control.cancel.cancelled() => return Ok(LoopAction::Shutdown),
            result = tokio::time::timeout(self.config.connect_timeout, connector.connect(&url)) => {
                result.map_err(|_| GatewayError::ConnectTimeout)??
            },
        };

        let hello = tokio::select! {
            biased;
            () = control.cancel.cancelled() => {
                Self::close(stream.as_mut(), close_code::NORMAL).await;
                return Ok(LoopAction::Shutdown);
            },
            result = tokio::time::timeout(HELLO_TIMEOUT, Self::wait_for_hello(stream.as_mut())) => {
                result.map_err(|_| GatewayError::HelloTimeout)??
            },
        };

        let period = Duration::from_millis(hello.heartbeat_interval);
        debug!(interval_ms = hello.heartbeat_interval, "Received Hello");
        let mut heartbeat = Heartbeat::new(period, fastrand::f64());

        if let Some(resume) = self.session.resume_payload(&self.config.token) {
            self.set_state(ConnectionState::Resuming, None);
            info!(
                session_id = self.session.session_id.as_deref().unwrap_or_default(),
                seq = self.session.sequence,
                "Resuming Gateway session"
            );
            Self::send(stream.as_mut(), &resume).await?;
        } else {
            self.set_state(ConnectionState::Identifying, None);
            info!(intents = self.config.intents.bits(), "Identifying");
            let identify = protocol::identify(&self.config.token, self.config.intents);
            Self::send(stream.as_mut(), &identify).await?;
        }

        let action = self.event_loop(stream.as_mut(), &mut heartbeat).await;

        let code = match action {
            Ok(LoopAction::Shutdown | LoopAction::Reconnect { reidentify: true, .. }) | Err(_) => {
                close_code::NORMAL
            },
            Ok(LoopAction::Reconnect { .. }) => close_code::RESUMABLE,
        };
        Self::close(stream.as_mut(), code).await;
        action
    }

    async fn wait_for_hello(stream: &mut dyn GatewayStream) -> GatewayResult<HelloPayload> {
        loop {
            let Some(text) = stream.recv().await? else {
                return Err(GatewayError::Protocol("Connection closed before Hello".into()));
            };
            let payload: GatewayPayload = serde_json::from_str(&text)?;
            if payload.op == opcode::HELLO {
                let data = payload
                    .d
                    .ok_or_else(|| GatewayError::Protocol("Hello missing data".into()))?;
                return Ok(serde_json::from_value(data)?);
            }
            trace!(op = payload.op, "Ignoring payload before Hello");
        }
    }

    /// Read and heartbeat until the connection must be replaced.
    async fn event_loop(
        &mut self,
        stream: &mut dyn GatewayStream,
        heartbeat: &mut Heartbeat,
    ) -> GatewayResult<LoopAction> {
        let control = Arc::clone(&self.control);

        loop {
            let ready = *self.state_tx.borrow() == ConnectionState::Ready;

            tokio::select! {
                biased;

                () = control.cancel.cancelled() => {
                    info!("Gateway session received shutdown signal");
                    return Ok(LoopAction::Shutdown);
                },

                () = control.reconnect.notified(), if ready => {
                    info!("Host requested reconnect");
                    return Ok(LoopAction::Reconnect {
                        reidentify: false,
                        delay: Delay::Immediate,
                    });
                },

                () = heartbeat.tick() => {
                    trace!(awaiting_ack = heartbeat.is_awaiting_ack(), "Heartbeat due");
                    match heartbeat.beat() {
                        Beat::Send => {
                            let payload = protocol::heartbeat(self.session.last_sequence());
                            Self::send(stream, &payload).await?;
                        },
                        Beat::Missed => {
                            warn!("Heartbeat not acknowledged, connection is a zombie");
                            return Ok(LoopAction::RESUME);
                        },
                    }
                },

                frame = stream.recv() => match frame {
                    Ok(Some(text)) => {
                        if let Some(action) = self.handle_frame(&text, stream, heartbeat).await? {
                            return Ok(action);
                        }
                    },
                    Ok(None) => {
                        warn!("Gateway stream ended");
                        return Ok(LoopAction::RESUME);
                    },
                    Err(GatewayError::Closed(code)) => return self.close_action(code),
                    Err(err) => {
                        warn!(error = %err, "Gateway read error");
                        return Ok(LoopAction::RESUME);
                    },
                },
            }
        }
    }

    /// Handle one text frame. Returns an action when the connection must end.
    async fn handle_frame(
        &mut self,
        text: &str,
        stream: &mut dyn GatewayStream,
        heartbeat: &mut Heartbeat,
    ) -> GatewayResult<Option<LoopAction>> {
        let payload: GatewayPayload = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to parse Gateway payload");
                return Ok(None);
            },
        };

        match payload.op {
            opcode::DISPATCH => {
                if let Some(seq) = payload.s {
                    self.session.observe_sequence(seq);
                }
                let name = payload.t.unwrap_or_default();
                let data = payload.d.unwrap_or(serde_json::Value::Null);
                match DispatchEvent::decode(&name, data) {
                    Ok(event) => self.handle_dispatch(&name, event),
                    Err(e) => warn!(event = %name, error = %e, "Dropping malformed dispatch"),
                }
                Ok(None)
            },
            opcode::HEARTBEAT => {
                debug!("Gateway requested heartbeat");
                let payload = protocol::heartbeat(self.session.last_sequence());
                Self::send(stream, &payload).await?;
                Ok(None)
            },
            opcode::HEARTBEAT_ACK => {
                heartbeat.ack();
                if let Some(latency) = heartbeat.latency() {
                    trace!(
                        latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        "Heartbeat acknowledged"
                    );
                }
                Ok(None)
            },
            opcode::RECONNECT => {
                info!("Server requested reconnect (op=7)");
                Ok(Some(LoopAction::Reconnect {
                    reidentify: false,
                    delay: Delay::Immediate,
                }))
            },
            opcode::INVALID_SESSION => {
                let resumable = payload
                    .d
                    .as_ref()
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                let reidentify = !(resumable && self.session.can_resume());
                info!(resumable, "Invalid session (op=9)");
                Ok(Some(LoopAction::Reconnect {
                    reidentify,
                    delay: Delay::Fixed(Duration::from_millis(fastrand::u64(1000..=5000))),
                }))
            },
            opcode::HELLO => {
                debug!("Unexpected Hello (op=10) mid-session");
                Ok(None)
            },
            op => {
                debug!(op, "Unknown Gateway opcode");
                Ok(None)
            },
        }
    }

    fn handle_dispatch(&mut self, name: &str, event: DispatchEvent) {
        match event {
            DispatchEvent::Ready(ready) => {
                info!(
                    session_id = %ready.session_id,
                    user_id = %ready.user.id,
                    "Gateway session established (READY)"
                );
                if ready
                    .resume_gateway_url
                    .as_deref()
                    .is_some_and(|url| !protocol::is_valid_resume_url(url))
                {
                    warn!("READY contained an invalid resume URL, ignoring it");
                }
                self.user_tx.send_replace(Some(adapt::adapt_user(&ready.user)));
                self.session
                    .establish(ready.session_id, ready.resume_gateway_url, ready.user);
                self.on_handshake_complete("ready");
            },
            DispatchEvent::Resumed(_) => {
                info!(seq = self.session.sequence, "Gateway session resumed");
                self.on_handshake_complete("resumed");
            },
            DispatchEvent::Unknown => trace!(event = name, "Ignoring Gateway dispatch"),
            event => {
                let self_id = self
                    .session
                    .self_user
                    .as_ref()
                    .map_or("", |user| user.id.as_str());
                if let Some(adapted) = adapt::adapt_dispatch(event, self_id) {
                    debug!(event = name, kind = %adapted.kind, "Publishing dispatch");
                    self.bus.publish(TesseraEvent::Dispatch {
                        metadata: EventMetadata::new(EVENT_SOURCE),
                        event: adapted,
                    });
                } else {
                    trace!(event = name, "Dispatch produced no event");
                }
            },
        }
    }

    fn on_handshake_complete(&mut self, detail: &str) {
        self.backoff.reset();
        if std::mem::take(&mut self.reconnect_in_flight)
            && self.control.reconnect.notified().now_or_never().is_some()
        {
            debug!("Coalesced reconnect requests made while reconnecting");
        }
        self.set_state(ConnectionState::Ready, Some(detail));
    }

    fn close_action(&self, code: u16) -> GatewayResult<LoopAction> {
        match protocol::classify_close_code(code) {
            CloseAction::AuthenticationFailed => Err(GatewayError::AuthenticationFailed),
            CloseAction::InvalidConfiguration => Err(GatewayError::InvalidConfiguration(code)),
            CloseAction::Reidentify => {
                info!(code, "Session invalidated by close code, re-identifying");
                Ok(LoopAction::Reconnect {
                    reidentify: true,
                    delay: Delay::Backoff,
                })
            },
            CloseAction::Resume => {
                warn!(code, resumable = self.session.can_resume(), "Gateway closed connection");
                Ok(LoopAction::RESUME)
            },
        }
    }

    fn set_state(&self, state: ConnectionState, detail: Option<&str>) {
        let previous = self.state_tx.send_replace(state);
        if previous == state {
            return;
        }
        debug!(from = %previous, to = %state, "Gateway state changed");
        self.bus.publish(TesseraEvent::Status {
            metadata: EventMetadata::new(EVENT_SOURCE),
            state,
            detail: detail.map(str::to_owned),
        });
    }

    /// Sleep for `duration`. Returns `false` if shutdown was requested.
    async fn sleep_or_cancel(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.control.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    async fn send(stream: &mut dyn GatewayStream, payload: &GatewayPayload) -> GatewayResult<()> {
        let text = serde_json::to_string(payload)?;
        trace!(op = payload.op, "Sending Gateway payload");
        stream.send(text).await
    }

    async fn close(stream: &mut dyn GatewayStream, code: u16) {
        match tokio::time::timeout(CLOSE_TIMEOUT, stream.close(code)).await {
            Ok(Ok(())) => debug!(code, "Closed Gateway connection"),
            Ok(Err(e)) => debug!(code, error = %e, "Close frame not sent"),
            Err(_) => debug!(code, "Timed out sending close frame"),
        }
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("config", &self.config)
            .field("state", &*self.state_tx.borrow())
            .field("session_id", &self.session.session_id)
            .field("sequence", &self.session.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self, _url: &str) -> GatewayResult<Box<dyn GatewayStream>> {
            Err(GatewayError::Transport("unreachable".into()))
        }
    }

    fn test_session(bus: &EventBus) -> (GatewaySession, SessionHandle) {
        GatewaySession::new(
            GatewayConfig::new("secret-token"),
            Arc::new(Unreachable),
            bus.clone(),
        )
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = GatewayConfig::new("secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn config_from_loaded_config() {
        let mut config = Config::default();
        assert!(GatewayConfig::from_config(&config).is_none());

        config.discord.token = Some("T".into());
        config.discord.intents.members = false;
        config.reconnect.max_attempts = Some(5);
        let gateway = GatewayConfig::from_config(&config).unwrap();
        assert_eq!(gateway.token, "T");
        assert_eq!(gateway.intents, Intents::BASE);
        assert_eq!(gateway.max_reconnect_attempts, Some(5));
        assert_eq!(gateway.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn close_codes_map_to_actions() {
        let bus = EventBus::new();
        let (session, _handle) = test_session(&bus);

        assert!(matches!(
            session.close_action(4004),
            Err(GatewayError::AuthenticationFailed)
        ));
        assert!(matches!(
            session.close_action(4014),
            Err(GatewayError::InvalidConfiguration(4014))
        ));
        assert_eq!(
            session.close_action(4009).unwrap(),
            LoopAction::Reconnect {
                reidentify: true,
                delay: Delay::Backoff
            }
        );
        assert_eq!(session.close_action(4000).unwrap(), LoopAction::RESUME);
    }

    #[test]
    fn state_changes_are_published_once() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let (session, handle) = test_session(&bus);

        session.set_state(ConnectionState::Connecting, None);
        session.set_state(ConnectionState::Connecting, None);
        assert_eq!(handle.state(), ConnectionState::Connecting);

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            &*event,
            TesseraEvent::Status {
                state: ConnectionState::Connecting,
                ..
            }
        ));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn backoff_limit_is_enforced() {
        let bus = EventBus::new();
        let mut config = GatewayConfig::new("T");
        config.max_reconnect_attempts = Some(2);
        let (mut session, _handle) = GatewaySession::new(config, Arc::new(Unreachable), bus);

        assert!(session.next_backoff().is_ok());
        assert!(session.next_backoff().is_ok());
        assert!(matches!(
            session.next_backoff(),
            Err(GatewayError::ReconnectLimit(2))
        ));
    }

    #[tokio::test]
    async fn shutdown_before_run_returns_ok() {
        let bus = EventBus::new();
        let (session, handle) = test_session(&bus);
        handle.shutdown();
        assert!(handle.is_shutdown());
        session.run().await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_limit_is_fatal() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut config = GatewayConfig::new("T");
        config.max_reconnect_attempts = Some(1);
        let (session, _handle) = GatewaySession::new(config, Arc::new(Unreachable), bus.clone());

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, GatewayError::ReconnectLimit(1)));

        let mut fatal = 0;
        while let Some(event) = rx.try_recv() {
            if matches!(&*event, TesseraEvent::Fatal { .. }) {
                fatal += 1;
            }
        }
        assert_eq!(fatal, 1);
    }
}
