//! Reconnecting websocket session for one channel group.
//!
//! A session owns one long-lived connection (public or private), runs
//! the subscribe handshake, and forwards every decoded payload to the
//! registered handler. Any failure sends the session through a fixed
//! backoff delay and back to connecting; the loop only ends through the
//! cancellation token. The delay is deliberately flat: the exchange
//! either recovers quickly or not at all.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::GmoConfig;
use crate::stream::channels::Channel;
use crate::token::{TokenError, TokenHandle};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors that end one stream connection and trigger a reconnect.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Private-session token acquisition failed.
    #[error("token acquisition failed: {0}")]
    Token(#[from] TokenError),

    /// Payload carried an explicit error field.
    #[error("stream payload carried an error: {0}")]
    Server(String),

    /// Received a frame the protocol does not allow here.
    #[error("received non-text frame: {0}")]
    NonText(&'static str),

    /// Peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

/// Lifecycle state of a stream session, observable through
/// [`StreamSession::state`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Resolving credentials and opening the socket.
    Connecting,
    /// Socket open; sending subscribe messages.
    Subscribing,
    /// Handshake complete; forwarding payloads.
    Active,
    /// Connection failed; waiting out the reconnect delay.
    Backoff,
}

/// Receiver of decoded stream payloads.
///
/// Handler errors are logged and the session keeps running; one bad
/// message cannot take a stream down.
#[async_trait]
pub trait MessageHandler: Send {
    /// Called once per decoded inbound payload, in arrival order.
    async fn on_message(
        &mut self,
        message: Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

enum StreamAuth {
    Public,
    Private(TokenHandle),
}

/// One reconnecting websocket session over a fixed channel group.
pub struct StreamSession<H> {
    config: Arc<GmoConfig>,
    channels: Vec<Channel>,
    auth: StreamAuth,
    handler: H,
    label: &'static str,
    state_tx: watch::Sender<SessionState>,
}

impl<H: MessageHandler> StreamSession<H> {
    /// Creates a session over the public market-data stream.
    pub fn public(config: Arc<GmoConfig>, channels: Vec<Channel>, handler: H) -> Self {
        Self::new(config, channels, StreamAuth::Public, handler, "public")
    }

    /// Creates a session over the private account-event stream.
    ///
    /// The access token is acquired through `token` while connecting
    /// and invalidated whenever the connection fails, so every
    /// reconnect starts from a fresh token.
    pub fn private(
        config: Arc<GmoConfig>,
        channels: Vec<Channel>,
        token: TokenHandle,
        handler: H,
    ) -> Self {
        Self::new(config, channels, StreamAuth::Private(token), handler, "private")
    }

    fn new(
        config: Arc<GmoConfig>,
        channels: Vec<Channel>,
        auth: StreamAuth,
        handler: H,
        label: &'static str,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            config,
            channels,
            auth,
            handler,
            label,
            state_tx,
        }
    }

    /// Returns a watch receiver observing the session state.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Runs the session until `cancel` is triggered.
    ///
    /// Failures are logged and retried after the configured reconnect
    /// delay, forever; the token is cleared before each retry on the
    /// private stream.
    pub async fn run(mut self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            match self.run_connection(&cancel).await {
                // Only cancellation ends a connection without error.
                Ok(()) => break,
                Err(err) => {
                    warn!(session = self.label, error = %err, "stream connection failed");
                    self.transition(SessionState::Backoff);
                    if let StreamAuth::Private(token) = &self.auth {
                        token.invalidate();
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
        self.transition(SessionState::Disconnected);
    }

    async fn run_connection(&mut self, cancel: &CancellationToken) -> Result<(), StreamError> {
        self.transition(SessionState::Connecting);

        let url = match &self.auth {
            StreamAuth::Public => self.config.public_ws_url.clone(),
            StreamAuth::Private(token) => {
                let token = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    token = token.acquire() => token?,
                };
                format!("{}/{}", self.config.private_ws_url, token)
            }
        };

        let (mut socket, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            connected = connect_async(&url) => connected?,
        };

        self.transition(SessionState::Subscribing);
        for channel in self.channels.clone() {
            let command = channel.subscribe(&self.config.symbol);
            socket
                .send(Message::Text(serde_json::to_string(&command)?))
                .await?;
            debug!(session = self.label, channel = channel.name(), "subscribed");
            // Exchange-side rate limit on subscription commands.
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = socket.close(None).await;
                    return Ok(());
                }
                _ = sleep(self.config.subscribe_interval) => {}
            }
        }

        self.transition(SessionState::Active);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = socket.close(None).await;
                    return Ok(());
                }
                frame = socket.next() => self.handle_frame(&mut socket, frame).await?,
            }
        }
    }

    async fn handle_frame(
        &mut self,
        socket: &mut WsStream,
        frame: Option<Result<Message, WsError>>,
    ) -> Result<(), StreamError> {
        match frame {
            Some(Ok(Message::Text(text))) => {
                let payload: Value = serde_json::from_str(&text)?;
                if let Some(error) = payload.get("error") {
                    return Err(StreamError::Server(error.to_string()));
                }
                if let Err(err) = self.handler.on_message(payload).await {
                    error!(session = self.label, error = %err, "stream handler failed");
                }
                Ok(())
            }
            Some(Ok(Message::Ping(payload))) => {
                socket.send(Message::Pong(payload)).await?;
                Ok(())
            }
            Some(Ok(Message::Pong(_))) => Ok(()),
            Some(Ok(Message::Close(_))) => Err(StreamError::Closed),
            Some(Ok(Message::Binary(_))) => Err(StreamError::NonText("binary")),
            Some(Ok(Message::Frame(_))) => Err(StreamError::NonText("raw frame")),
            Some(Err(err)) => Err(err.into()),
            None => Err(StreamError::Closed),
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            debug!(session = self.label, from = ?previous, to = ?next, "session state");
        }
    }
}
