//! Channel table and subscription control messages.
//!
//! The per-channel parameters are a fixed exchange contract: `trades`
//! takes a symbol and the `TAKER_ONLY` option, `ticker`/`orderbooks`
//! take a symbol, `positionSummaryEvents` takes the `PERIODIC` option,
//! and the remaining private event channels take nothing.

use serde::Serialize;

/// Subscription command verb.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamCommand {
    /// Start receiving a channel.
    Subscribe,
    /// Stop receiving a channel.
    Unsubscribe,
}

/// Named subscription stream carried over one websocket connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channel {
    /// Latest rate updates.
    Ticker,
    /// Order book updates.
    Orderbooks,
    /// Public trade prints.
    Trades,
    /// Own execution events.
    ExecutionEvents,
    /// Own order events.
    OrderEvents,
    /// Own position events.
    PositionEvents,
    /// Periodic position summaries.
    PositionSummaryEvents,
}

impl Channel {
    /// Channels carried by the public stream.
    pub const PUBLIC: [Channel; 3] = [Channel::Ticker, Channel::Orderbooks, Channel::Trades];

    /// Channels carried by the private stream.
    pub const PRIVATE: [Channel; 4] = [
        Channel::ExecutionEvents,
        Channel::OrderEvents,
        Channel::PositionEvents,
        Channel::PositionSummaryEvents,
    ];

    /// Wire name of the channel.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::Orderbooks => "orderbooks",
            Channel::Trades => "trades",
            Channel::ExecutionEvents => "executionEvents",
            Channel::OrderEvents => "orderEvents",
            Channel::PositionEvents => "positionEvents",
            Channel::PositionSummaryEvents => "positionSummaryEvents",
        }
    }

    /// Builds the subscribe message for this channel.
    pub fn subscribe(self, symbol: &str) -> SubscribeCommand {
        self.message(StreamCommand::Subscribe, symbol)
    }

    /// Builds the unsubscribe message for this channel.
    pub fn unsubscribe(self, symbol: &str) -> SubscribeCommand {
        self.message(StreamCommand::Unsubscribe, symbol)
    }

    fn message(self, command: StreamCommand, symbol: &str) -> SubscribeCommand {
        let (symbol, option) = match self {
            Channel::Trades => (Some(symbol.to_string()), Some("TAKER_ONLY".to_string())),
            Channel::Ticker | Channel::Orderbooks => (Some(symbol.to_string()), None),
            Channel::PositionSummaryEvents => (None, Some("PERIODIC".to_string())),
            _ => (None, None),
        };

        SubscribeCommand {
            command,
            channel: self.name(),
            symbol,
            option,
        }
    }
}

/// Outbound websocket control message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscribeCommand {
    /// Command verb.
    pub command: StreamCommand,
    /// Channel wire name.
    pub channel: &'static str,
    /// Symbol, for symbol-scoped channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Channel-specific option flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}
