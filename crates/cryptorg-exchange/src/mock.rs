//! Scriptable in-memory exchange.
//!
//! Stands in for Bybit in tests and dry runs: fills market orders at a
//! configured price, accepts limit orders as resting, and lets callers
//! script failures and realtime lookups per order.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{ExchangeCancelRequest, ExchangeOrderRequest, ExchangeOrderResponse};
use crate::ExchangeApi;

#[derive(Default)]
struct MockState {
    fill_price: String,
    next_id: u64,
    create_calls: u64,
    create_requests: Vec<ExchangeOrderRequest>,
    cancel_requests: Vec<ExchangeCancelRequest>,
    fail_creates_on: HashSet<u64>,
    fail_all_creates: bool,
    fail_cancels: bool,
    order_info: HashMap<String, ExchangeOrderResponse>,
}

/// In-memory `ExchangeApi` implementation.
pub struct MockExchange {
    state: Mutex<MockState>,
}

impl MockExchange {
    /// Mock exchange filling market orders at `fill_price`.
    pub fn new(fill_price: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MockState {
                fill_price: fill_price.into(),
                ..Default::default()
            }),
        }
    }

    /// Fail the n-th order placement (1-based, counted across the mock's life).
    pub fn fail_create_on(&self, call: u64) {
        self.state.lock().fail_creates_on.insert(call);
    }

    /// Fail every order placement from now on.
    pub fn fail_all_creates(&self) {
        self.state.lock().fail_all_creates = true;
    }

    /// Fail every cancel from now on.
    pub fn fail_cancels(&self) {
        self.state.lock().fail_cancels = true;
    }

    /// Script the realtime lookup for an exchange order id.
    pub fn set_order_info(&self, order_id: impl Into<String>, info: ExchangeOrderResponse) {
        self.state.lock().order_info.insert(order_id.into(), info);
    }

    /// Every create request the mock has seen, in order.
    pub fn create_requests(&self) -> Vec<ExchangeOrderRequest> {
        self.state.lock().create_requests.clone()
    }

    /// Exchange ids of every cancel the mock has seen, in order.
    pub fn cancelled_order_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .cancel_requests
            .iter()
            .map(|req| req.order_id.clone())
            .collect()
    }
}

#[async_trait]
impl ExchangeApi for MockExchange {
    async fn execute_order(
        &self,
        req: ExchangeOrderRequest,
    ) -> ExchangeResult<ExchangeOrderResponse> {
        let mut state = self.state.lock();
        state.create_calls += 1;

        if state.fail_all_creates || state.fail_creates_on.contains(&state.create_calls) {
            return Err(ExchangeError::Api {
                status: 403,
                body: "order rejected by mock".to_string(),
            });
        }

        state.next_id += 1;
        let order_id = format!("mock-{}", state.next_id);

        let is_market = req.order_type == "MARKET";
        let price = if req.price.is_empty() {
            state.fill_price.clone()
        } else {
            req.price.clone()
        };
        let (status, executed_qty) = if is_market {
            ("Filled".to_string(), req.qty.clone())
        } else {
            ("New".to_string(), "0".to_string())
        };

        let resp = ExchangeOrderResponse {
            symbol: req.symbol.clone(),
            order_id,
            order_link_id: String::new(),
            price,
            qty: req.qty.clone(),
            executed_qty,
            status,
            time_in_force: req.time_in_force.clone(),
            order_type: req.order_type.clone(),
            side: req.side.clone(),
            created_time: req.timestamp.to_string(),
        };

        state.create_requests.push(req);
        Ok(resp)
    }

    async fn terminate_order(&self, req: ExchangeCancelRequest) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        if state.fail_cancels {
            return Err(ExchangeError::Api {
                status: 400,
                body: "cancel rejected by mock".to_string(),
            });
        }
        state.cancel_requests.push(req);
        Ok(())
    }

    async fn fetch_order_info(
        &self,
        _symbol: &str,
        order_id: &str,
    ) -> ExchangeResult<ExchangeOrderResponse> {
        self.state
            .lock()
            .order_info
            .get(order_id)
            .cloned()
            .ok_or(ExchangeError::OrderNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_request(qty: &str) -> ExchangeOrderRequest {
        ExchangeOrderRequest {
            symbol: "SOLUSDT".to_string(),
            side: "BUY".to_string(),
            order_type: "MARKET".to_string(),
            qty: qty.to_string(),
            ..Default::default()
        }
    }

    fn limit_request(qty: &str, price: &str) -> ExchangeOrderRequest {
        ExchangeOrderRequest {
            symbol: "SOLUSDT".to_string(),
            side: "BUY".to_string(),
            order_type: "LIMIT".to_string(),
            qty: qty.to_string(),
            price: price.to_string(),
            time_in_force: "GTC".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_market_orders_fill_at_configured_price() {
        let mock = MockExchange::new("100.00000000");
        let resp = mock.execute_order(market_request("100")).await.unwrap();

        assert_eq!(resp.price, "100.00000000");
        assert_eq!(resp.status, "Filled");
        assert_eq!(resp.executed_qty, "100");
        assert_eq!(resp.order_id, "mock-1");
    }

    #[tokio::test]
    async fn test_limit_orders_rest() {
        let mock = MockExchange::new("100.00000000");
        let resp = mock
            .execute_order(limit_request("0.50505051", "99.00000000"))
            .await
            .unwrap();

        assert_eq!(resp.price, "99.00000000");
        assert_eq!(resp.status, "New");
        assert_eq!(resp.executed_qty, "0");
    }

    #[tokio::test]
    async fn test_scripted_create_failure() {
        let mock = MockExchange::new("100.00000000");
        mock.fail_create_on(2);

        assert!(mock.execute_order(market_request("100")).await.is_ok());
        assert!(mock.execute_order(market_request("100")).await.is_err());
        assert!(mock.execute_order(market_request("100")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_order_lookup() {
        let mock = MockExchange::new("100.00000000");
        let err = mock.fetch_order_info("SOLUSDT", "nope").await.unwrap_err();
        assert!(matches!(err, ExchangeError::OrderNotFound));
    }

    #[tokio::test]
    async fn test_cancels_are_recorded() {
        let mock = MockExchange::new("100.00000000");
        mock.terminate_order(ExchangeCancelRequest {
            symbol: "SOLUSDT".to_string(),
            order_id: "mock-7".to_string(),
            timestamp: 0,
        })
        .await
        .unwrap();

        assert_eq!(mock.cancelled_order_ids(), vec!["mock-7".to_string()]);
    }
}
