//! Transport for the Discord Gateway.
//!
//! The session manager talks to the gateway through [`Connector`] and
//! [`GatewayStream`], which carry text frames and close codes and know nothing
//! about the protocol. [`WsConnector`] is the `tokio-tungstenite`
//! implementation; tests substitute an in-memory peer.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

use super::error::{GatewayError, GatewayResult};

/// Opens gateway connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url` (already carrying the version query).
    async fn connect(&self, url: &str) -> GatewayResult<Box<dyn GatewayStream>>;
}

/// A live, message-framed gateway connection.
#[async_trait]
pub trait GatewayStream: Send {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> GatewayResult<()>;

    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` when the stream ends without a close frame and
    /// [`GatewayError::Closed`] when the peer sends one. Must be cancel safe.
    async fn recv(&mut self) -> GatewayResult<Option<String>>;

    /// Send a close frame with `code`.
    async fn close(&mut self, code: u16) -> GatewayResult<()>;
}

/// [`Connector`] over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> GatewayResult<Box<dyn GatewayStream>> {
        let (ws, response) = connect_async(url).await?;
        trace!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsStream { inner: ws }))
    }
}

/// A `tokio-tungstenite` connection.
struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl GatewayStream for WsStream {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        self.inner.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> GatewayResult<Option<String>> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map_or(1000, |f| f.code.into());
                    return Err(GatewayError::Closed(code));
                },
                Some(Ok(
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_),
                )) => {
                    // Ping/pong handled by tungstenite; binary skipped.
                },
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        let frame = CloseFrame {
            code: code.into(),
            reason: "closing".into(),
        };
        self.inner.send(Message::Close(Some(frame))).await?;
        Ok(())
    }
}
