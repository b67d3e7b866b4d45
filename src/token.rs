//! Private websocket access-token lifecycle.
//!
//! One spawned [`TokenKeeper`] task owns the token; everything else
//! talks to it through a cloneable [`TokenHandle`]. Serializing all
//! reads and writes through the keeper makes acquisition single-flight:
//! two sessions reconnecting at once cannot race each other into
//! requesting two tokens.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::rest::{RestClient, RestError};

/// Errors produced while acquiring an access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token-creation request failed at the REST layer.
    #[error("token request failed: {0}")]
    Rest(#[from] RestError),

    /// The dispatcher returned no slot for the token request.
    #[error("token endpoint returned no result")]
    MissingSlot,

    /// The exchange rejected the token request.
    #[error("token request rejected: {body}")]
    Rejected {
        /// Response envelope as returned by the exchange.
        body: String,
    },

    /// The response envelope carried no token value.
    #[error("malformed token response: {body}")]
    Malformed {
        /// Response envelope as returned by the exchange.
        body: String,
    },

    /// The keeper task is no longer running.
    #[error("token keeper is gone")]
    KeeperGone,
}

enum TokenCommand {
    Acquire(oneshot::Sender<Result<String, TokenError>>),
    Invalidate,
    Current(oneshot::Sender<Option<String>>),
}

/// Cloneable handle to the token keeper task.
#[derive(Clone)]
pub struct TokenHandle {
    tx: mpsc::UnboundedSender<TokenCommand>,
}

impl TokenHandle {
    /// Returns the current token, acquiring a fresh one first if none
    /// is set.
    pub async fn acquire(&self) -> Result<String, TokenError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(TokenCommand::Acquire(reply_tx))
            .map_err(|_| TokenError::KeeperGone)?;
        reply_rx.await.map_err(|_| TokenError::KeeperGone)?
    }

    /// Clears the token so the next [`acquire`](Self::acquire)
    /// requests a fresh one. Called by the private stream session when
    /// its connection fails.
    pub fn invalidate(&self) {
        let _ = self.tx.send(TokenCommand::Invalidate);
    }

    /// Returns the token currently held, without acquiring one.
    pub async fn current(&self) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(TokenCommand::Current(reply_tx)).is_err() {
            return None;
        }
        reply_rx.await.unwrap_or(None)
    }
}

/// Actor task owning the private websocket access token.
pub struct TokenKeeper {
    rest: Arc<RestClient>,
    rx: mpsc::UnboundedReceiver<TokenCommand>,
    token: Option<String>,
}

impl TokenKeeper {
    /// Creates a keeper bound to the given REST dispatcher, returning
    /// the keeper and a handle to it. The keeper does nothing until
    /// [`run`](Self::run) is spawned.
    pub fn new(rest: Arc<RestClient>) -> (Self, TokenHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rest,
                rx,
                token: None,
            },
            TokenHandle { tx },
        )
    }

    /// Serves handle commands and periodically extends the token.
    ///
    /// Runs until cancelled or until every handle is dropped. The first
    /// renewal waits a full refresh period; renewal failures are logged
    /// and the current token is kept until the next attempt or until a
    /// connection failure forces re-acquisition.
    pub async fn run(mut self, cancel: CancellationToken) {
        let period = self.rest.config().token_refresh_interval;
        let mut renew = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = renew.tick() => self.extend().await,
                command = self.rx.recv() => match command {
                    Some(TokenCommand::Acquire(reply)) => {
                        let result = self.acquire().await;
                        let _ = reply.send(result);
                    }
                    Some(TokenCommand::Invalidate) => {
                        if self.token.take().is_some() {
                            debug!("access token invalidated");
                        }
                    }
                    Some(TokenCommand::Current(reply)) => {
                        let _ = reply.send(self.token.clone());
                    }
                    None => break,
                },
            }
        }
    }

    async fn acquire(&mut self) -> Result<String, TokenError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let mut batch = self.rest.batch();
        batch.create_ws_token();
        let slot = self
            .rest
            .dispatch(batch)
            .await
            .into_iter()
            .next()
            .ok_or(TokenError::MissingSlot)?;
        let value = slot?;

        let token = match value.get("data").and_then(Value::as_str) {
            Some(token) => token.to_string(),
            None if value.get("status").and_then(Value::as_i64) != Some(0) => {
                return Err(TokenError::Rejected {
                    body: value.to_string(),
                });
            }
            None => {
                return Err(TokenError::Malformed {
                    body: value.to_string(),
                });
            }
        };

        debug!("access token acquired");
        self.token = Some(token.clone());
        Ok(token)
    }

    async fn extend(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };

        let mut batch = self.rest.batch();
        batch.extend_ws_token(&token);
        match self.rest.dispatch(batch).await.into_iter().next() {
            Some(Ok(value)) if value.get("status").and_then(Value::as_i64) == Some(0) => {
                debug!("access token extended");
            }
            Some(Ok(value)) => {
                warn!(body = %value, "access token extension rejected; keeping current token");
            }
            Some(Err(err)) => {
                warn!(error = %err, "access token extension failed; keeping current token");
            }
            None => {}
        }
    }
}
