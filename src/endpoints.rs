//! Thin builders for the exchange REST endpoints.
//!
//! Each builder assembles a parameter map and calls
//! [`RequestBatch::build`]; nothing here touches the network. Symbol-
//! scoped endpoints use the configured symbol.

use reqwest::Method;
use serde_json::{Map, Value};

use crate::rest::{RequestBatch, Visibility};

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

impl RequestBatch {
    // ---- public API ----

    /// Exchange operating status.
    pub fn status(&mut self) {
        self.build(Method::GET, Visibility::Public, "/v1/status", Map::new());
    }

    /// Latest rate for the configured symbol.
    pub fn ticker(&mut self) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        self.build(Method::GET, Visibility::Public, "/v1/ticker", params);
    }

    /// Order book snapshot for the configured symbol.
    pub fn orderbooks(&mut self) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        self.build(Method::GET, Visibility::Public, "/v1/orderbooks", params);
    }

    /// Public trade history page.
    pub fn trades(&mut self, page: u32, count: u32) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("page".to_string(), Value::from(page));
        params.insert("count".to_string(), Value::from(count));
        self.build(Method::GET, Visibility::Public, "/v1/trades", params);
    }

    // ---- private API ----

    /// Margin (trading capacity) information.
    pub fn margin(&mut self) {
        self.build(
            Method::GET,
            Visibility::Private,
            "/v1/account/margin",
            Map::new(),
        );
    }

    /// Asset balances.
    pub fn assets(&mut self) {
        self.build(
            Method::GET,
            Visibility::Private,
            "/v1/account/assets",
            Map::new(),
        );
    }

    /// Order details by order id.
    pub fn orders(&mut self, order_id: &str) {
        let mut params = Map::new();
        params.insert("orderId".to_string(), text(order_id));
        self.build(Method::GET, Visibility::Private, "/v1/orders", params);
    }

    /// Open (active) orders page.
    pub fn active_orders(&mut self, page: u32, count: u32) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("page".to_string(), Value::from(page));
        params.insert("count".to_string(), Value::from(count));
        self.build(Method::GET, Visibility::Private, "/v1/activeOrders", params);
    }

    /// Executions by order id or execution id; order id wins when both
    /// are given.
    pub fn executions(&mut self, order_id: Option<&str>, execution_id: Option<&str>) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        if let Some(order_id) = order_id {
            params.insert("orderId".to_string(), text(order_id));
        } else if let Some(execution_id) = execution_id {
            params.insert("executionId".to_string(), text(execution_id));
        }
        self.build(Method::GET, Visibility::Private, "/v1/executions", params);
    }

    /// Latest executions page.
    pub fn latest_executions(&mut self, page: u32, count: u32) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("page".to_string(), Value::from(page));
        params.insert("count".to_string(), Value::from(count));
        self.build(
            Method::GET,
            Visibility::Private,
            "/v1/latestExecutions",
            params,
        );
    }

    /// Open positions page.
    pub fn open_positions(&mut self, page: u32, count: u32) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("page".to_string(), Value::from(page));
        params.insert("count".to_string(), Value::from(count));
        self.build(
            Method::GET,
            Visibility::Private,
            "/v1/openPositions",
            params,
        );
    }

    /// Position summary for the configured symbol.
    pub fn position_summary(&mut self) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        self.build(
            Method::GET,
            Visibility::Private,
            "/v1/positionSummary",
            params,
        );
    }

    /// Places a new order.
    pub fn order(
        &mut self,
        side: &str,
        execution_type: &str,
        price: &str,
        size: &str,
        losscut_price: Option<&str>,
        time_in_force: Option<&str>,
    ) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("side".to_string(), text(side));
        params.insert("executionType".to_string(), text(execution_type));
        params.insert("price".to_string(), text(price));
        params.insert("size".to_string(), text(size));
        if let Some(losscut_price) = losscut_price {
            params.insert("losscutPrice".to_string(), text(losscut_price));
        }
        if let Some(time_in_force) = time_in_force {
            params.insert("timeInForce".to_string(), text(time_in_force));
        }
        self.build(Method::POST, Visibility::Private, "/v1/order", params);
    }

    /// Amends an existing order's price.
    pub fn change_order(&mut self, order_id: &str, price: &str, losscut_price: Option<&str>) {
        let mut params = Map::new();
        params.insert("orderId".to_string(), text(order_id));
        params.insert("price".to_string(), text(price));
        if let Some(losscut_price) = losscut_price {
            params.insert("losscutPrice".to_string(), text(losscut_price));
        }
        self.build(Method::POST, Visibility::Private, "/v1/changeOrder", params);
    }

    /// Cancels an order.
    pub fn cancel_order(&mut self, order_id: &str) {
        let mut params = Map::new();
        params.insert("orderId".to_string(), text(order_id));
        self.build(Method::POST, Visibility::Private, "/v1/cancelOrder", params);
    }

    /// Closes specific positions (leverage trading).
    pub fn close_order(
        &mut self,
        side: &str,
        execution_type: &str,
        price: &str,
        settle_position: Value,
        time_in_force: Option<&str>,
    ) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("side".to_string(), text(side));
        params.insert("executionType".to_string(), text(execution_type));
        params.insert("price".to_string(), text(price));
        params.insert("settlePosition".to_string(), settle_position);
        if let Some(time_in_force) = time_in_force {
            params.insert("timeInForce".to_string(), text(time_in_force));
        }
        self.build(Method::POST, Visibility::Private, "/v1/closeOrder", params);
    }

    /// Closes positions in bulk (leverage trading).
    pub fn close_bulk_order(
        &mut self,
        side: &str,
        execution_type: &str,
        price: &str,
        size: &str,
        time_in_force: Option<&str>,
    ) {
        let mut params = Map::new();
        params.insert("symbol".to_string(), text(&self.symbol()));
        params.insert("side".to_string(), text(side));
        params.insert("executionType".to_string(), text(execution_type));
        params.insert("price".to_string(), text(price));
        params.insert("size".to_string(), text(size));
        if let Some(time_in_force) = time_in_force {
            params.insert("timeInForce".to_string(), text(time_in_force));
        }
        self.build(
            Method::POST,
            Visibility::Private,
            "/v1/closeBulkOrder",
            params,
        );
    }

    /// Changes a position's losscut price (leverage trading).
    pub fn change_losscut_price(&mut self, position_id: &str, losscut_price: &str) {
        let mut params = Map::new();
        params.insert("positionId".to_string(), text(position_id));
        params.insert("losscutPrice".to_string(), text(losscut_price));
        self.build(
            Method::POST,
            Visibility::Private,
            "/v1/changeLosscutPrice",
            params,
        );
    }

    // ---- private websocket token ----

    /// Requests a new private-stream access token.
    pub fn create_ws_token(&mut self) {
        self.build(Method::POST, Visibility::Private, "/v1/ws-auth", Map::new());
    }

    /// Extends the validity of an access token.
    pub fn extend_ws_token(&mut self, token: &str) {
        let mut params = Map::new();
        params.insert("token".to_string(), text(token));
        self.build(Method::PUT, Visibility::Private, "/v1/ws-auth", params);
    }

    /// Deletes an access token.
    pub fn delete_ws_token(&mut self, token: &str) {
        let mut params = Map::new();
        params.insert("token".to_string(), text(token));
        self.build(Method::DELETE, Visibility::Private, "/v1/ws-auth", params);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;
    use serde_json::json;

    use crate::auth::Credentials;
    use crate::config::GmoConfig;
    use crate::rest::RequestBatch;

    fn batch() -> RequestBatch {
        RequestBatch::new(
            Arc::new(GmoConfig::default()),
            Arc::new(Credentials::new(
                "key-1",
                SecretString::new("s3cr3t".to_string()),
            )),
        )
    }

    #[test]
    fn ticker_targets_public_base_with_symbol() {
        let mut batch = batch();
        batch.ticker();

        let request = &batch.requests()[0];
        assert_eq!(request.url(), "https://api.coin.z.com/public/v1/ticker");
        assert_eq!(
            request.query(),
            Some(&[("symbol".to_string(), "BTC_JPY".to_string())][..])
        );
    }

    #[test]
    fn trades_carries_paging_params() {
        let mut batch = batch();
        batch.trades(2, 50);

        let query = batch.requests()[0].query().expect("trades is a GET");
        assert!(query.contains(&("page".to_string(), "2".to_string())));
        assert!(query.contains(&("count".to_string(), "50".to_string())));
    }

    #[test]
    fn executions_prefers_order_id() {
        let mut batch = batch();
        batch.executions(Some("ord-1"), Some("exec-1"));

        let query = batch.requests()[0].query().expect("executions is a GET");
        assert!(query.contains(&("orderId".to_string(), "ord-1".to_string())));
        assert!(!query.iter().any(|(key, _)| key == "executionId"));
    }

    #[test]
    fn order_omits_unset_optionals() {
        let mut batch = batch();
        batch.order("BUY", "LIMIT", "1000000", "0.01", None, None);

        let body = batch.requests()[0].body().expect("order is a POST");
        let decoded: serde_json::Value = serde_json::from_str(body).expect("valid body");
        assert_eq!(decoded["side"], "BUY");
        assert_eq!(decoded["price"], "1000000");
        assert!(decoded.get("losscutPrice").is_none());
        assert!(decoded.get("timeInForce").is_none());
    }

    #[test]
    fn close_order_embeds_settle_positions() {
        let mut batch = batch();
        batch.close_order(
            "SELL",
            "MARKET",
            "0",
            json!([{"positionId": 12345, "size": "0.01"}]),
            None,
        );

        let body = batch.requests()[0].body().expect("close_order is a POST");
        let decoded: serde_json::Value = serde_json::from_str(body).expect("valid body");
        assert_eq!(decoded["settlePosition"][0]["positionId"], 12345);
    }

    #[test]
    fn ws_token_builders_target_ws_auth() {
        let mut batch = batch();
        batch.create_ws_token();
        batch.extend_ws_token("tok123");
        batch.delete_ws_token("tok123");

        let requests = batch.requests();
        assert_eq!(requests.len(), 3);
        for request in requests {
            assert_eq!(request.url(), "https://api.coin.z.com/private/v1/ws-auth");
        }
        assert_eq!(requests[1].body(), Some(r#"{"token":"tok123"}"#));
        assert_eq!(requests[2].body(), Some(r#"{"token":"tok123"}"#));
    }
}
