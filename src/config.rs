//! Exchange endpoints and timing configuration.
//!
//! `GmoConfig::default()` targets the production exchange. Tests and
//! alternative deployments override the URLs and shrink the delays.

use std::time::Duration;

/// Production public REST base URL.
pub const PUBLIC_REST_URL: &str = "https://api.coin.z.com/public";
/// Production private REST base URL.
pub const PRIVATE_REST_URL: &str = "https://api.coin.z.com/private";
/// Production public websocket endpoint.
pub const PUBLIC_WS_URL: &str = "wss://api.coin.z.com/ws/public/v1";
/// Production private websocket endpoint; the access token is appended
/// as the final path segment.
pub const PRIVATE_WS_URL: &str = "wss://api.coin.z.com/ws/private/v1";

/// Default timing values for the production exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GmoDefaults;

impl GmoDefaults {
    /// Per-request dispatch bound; generous because the exchange may
    /// hold responses during rate-limiting pauses.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3600);
    /// Delay between a stream failure and the next connect attempt.
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);
    /// Gap between consecutive subscribe messages; the exchange rate
    /// limits subscription commands.
    pub const SUBSCRIBE_INTERVAL: Duration = Duration::from_secs(2);
    /// Access-token renewal period, below the token validity window.
    pub const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(3000);
    /// Default trading symbol.
    pub const SYMBOL: &'static str = "BTC_JPY";
}

/// Endpoint URLs, symbol, and timing knobs shared across the SDK.
#[derive(Clone, Debug)]
pub struct GmoConfig {
    /// Public REST base URL.
    pub public_rest_url: String,
    /// Private REST base URL.
    pub private_rest_url: String,
    /// Public websocket endpoint.
    pub public_ws_url: String,
    /// Private websocket endpoint (without the token segment).
    pub private_ws_url: String,
    /// Symbol used by the symbol-scoped endpoint builders.
    pub symbol: String,
    /// Upper bound for a single dispatched request.
    pub request_timeout: Duration,
    /// Fixed delay between stream reconnect attempts.
    pub reconnect_delay: Duration,
    /// Fixed delay between consecutive subscribe messages.
    pub subscribe_interval: Duration,
    /// Period of the background access-token renewal.
    pub token_refresh_interval: Duration,
}

impl Default for GmoConfig {
    fn default() -> Self {
        Self {
            public_rest_url: PUBLIC_REST_URL.to_string(),
            private_rest_url: PRIVATE_REST_URL.to_string(),
            public_ws_url: PUBLIC_WS_URL.to_string(),
            private_ws_url: PRIVATE_WS_URL.to_string(),
            symbol: GmoDefaults::SYMBOL.to_string(),
            request_timeout: GmoDefaults::REQUEST_TIMEOUT,
            reconnect_delay: GmoDefaults::RECONNECT_DELAY,
            subscribe_interval: GmoDefaults::SUBSCRIBE_INTERVAL,
            token_refresh_interval: GmoDefaults::TOKEN_REFRESH_INTERVAL,
        }
    }
}

impl GmoConfig {
    /// Overrides the trading symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{GmoConfig, PRIVATE_WS_URL, PUBLIC_REST_URL};

    #[test]
    fn default_config_targets_production() {
        let config = GmoConfig::default();
        assert_eq!(config.public_rest_url, PUBLIC_REST_URL);
        assert_eq!(config.private_ws_url, PRIVATE_WS_URL);
        assert_eq!(config.symbol, "BTC_JPY");
    }

    #[test]
    fn with_symbol_overrides_default() {
        let config = GmoConfig::default().with_symbol("ETH_JPY");
        assert_eq!(config.symbol, "ETH_JPY");
    }
}
