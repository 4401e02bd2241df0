//! Domain-level order placement over the exchange client.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use cryptorg_core::constants::DEFAULT_TIME_IN_FORCE;
use cryptorg_core::{
    quantity_from_usdt, CreateOrderRequest, Order, OrderSide, OrderStatus, OrderType,
};
use cryptorg_exchange::{
    ExchangeApi, ExchangeCancelRequest, ExchangeOrderRequest, ExchangeOrderResponse,
};

use crate::error::{EngineError, EngineResult};

/// Translates domain order requests into exchange calls and wraps the
/// responses back into domain `Order`s with fresh local ids.
pub struct OrderService {
    exchange: Arc<dyn ExchangeApi>,
}

impl OrderService {
    pub fn new(exchange: Arc<dyn ExchangeApi>) -> Self {
        Self { exchange }
    }

    /// Place a market order. The quantity is passed through as-is; no
    /// price is sent.
    pub async fn execute_market_order(&self, req: CreateOrderRequest) -> EngineResult<Order> {
        if req.symbol.is_empty() || req.quantity.is_empty() {
            return Err(EngineError::Validation(
                "symbol and quantity are required".to_string(),
            ));
        }

        let exchange_req = ExchangeOrderRequest {
            symbol: req.symbol,
            side: req.side.as_str().to_string(),
            order_type: OrderType::Market.as_str().to_string(),
            qty: req.quantity,
            ..Default::default()
        };

        let resp = self.exchange.execute_order(exchange_req).await?;
        Ok(order_from_response(resp))
    }

    /// Place a GTC limit order. The requested quantity is a USDT notional
    /// and is converted to a base quantity at the limit price.
    pub async fn execute_limit_order(&self, req: CreateOrderRequest) -> EngineResult<Order> {
        if req.price.is_empty() {
            return Err(EngineError::Validation(
                "price is required for limit order".to_string(),
            ));
        }

        let quantity = quantity_from_usdt(&req.quantity, &req.price)?;
        debug!(
            symbol = %req.symbol,
            notional = %req.quantity,
            price = %req.price,
            quantity = %quantity,
            "Converted limit order notional"
        );

        let exchange_req = ExchangeOrderRequest {
            symbol: req.symbol,
            side: req.side.as_str().to_string(),
            order_type: OrderType::Limit.as_str().to_string(),
            qty: quantity,
            price: req.price,
            time_in_force: DEFAULT_TIME_IN_FORCE.to_string(),
            ..Default::default()
        };

        let resp = self.exchange.execute_order(exchange_req).await?;
        Ok(order_from_response(resp))
    }

    /// Cancel an order by its exchange id.
    pub async fn terminate_order(&self, symbol: &str, exchange_id: &str) -> EngineResult<()> {
        let req = ExchangeCancelRequest {
            symbol: symbol.to_string(),
            order_id: exchange_id.to_string(),
            timestamp: 0,
        };
        self.exchange.terminate_order(req).await?;
        Ok(())
    }

    /// Re-query an order and return a fresh domain view of it.
    pub async fn fetch_order_status(&self, symbol: &str, exchange_id: &str) -> EngineResult<Order> {
        let resp = self.exchange.fetch_order_info(symbol, exchange_id).await?;
        Ok(order_from_response(resp))
    }
}

/// Build a domain order from an exchange response.
///
/// Every returned order gets a freshly generated local id and current
/// timestamps; the exchange response is authoritative for everything else.
fn order_from_response(resp: ExchangeOrderResponse) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        exchange_id: resp.order_id,
        symbol: resp.symbol,
        side: if resp.side.eq_ignore_ascii_case("SELL") {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        },
        order_type: if resp.order_type.eq_ignore_ascii_case("LIMIT") {
            OrderType::Limit
        } else {
            OrderType::Market
        },
        quantity: resp.qty,
        price: resp.price,
        status: OrderStatus::from_exchange(&resp.status),
        executed_qty: resp.executed_qty,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptorg_exchange::MockExchange;

    fn service(mock: Arc<MockExchange>) -> OrderService {
        OrderService::new(mock)
    }

    fn market_request() -> CreateOrderRequest {
        CreateOrderRequest {
            symbol: "SOLUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: "100".to_string(),
            price: String::new(),
        }
    }

    fn limit_request(quantity: &str, price: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            symbol: "SOLUSDT".to_string(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            quantity: quantity.to_string(),
            price: price.to_string(),
        }
    }

    #[tokio::test]
    async fn test_market_order_sends_no_price() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let order = service(mock.clone())
            .execute_market_order(market_request())
            .await
            .unwrap();

        let sent = mock.create_requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].price.is_empty());
        assert!(sent[0].time_in_force.is_empty());
        assert_eq!(sent[0].qty, "100");
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.price, "100.00000000");
    }

    #[tokio::test]
    async fn test_market_order_requires_symbol_and_quantity() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let svc = service(mock.clone());

        let mut req = market_request();
        req.symbol = String::new();
        assert!(matches!(
            svc.execute_market_order(req).await,
            Err(EngineError::Validation(_))
        ));

        let mut req = market_request();
        req.quantity = String::new();
        assert!(svc.execute_market_order(req).await.is_err());

        // Validation failures never reach the exchange.
        assert!(mock.create_requests().is_empty());
    }

    #[tokio::test]
    async fn test_limit_order_converts_usdt_notional() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let order = service(mock.clone())
            .execute_limit_order(limit_request("250", "102.00000000"))
            .await
            .unwrap();

        let sent = mock.create_requests();
        assert_eq!(sent[0].qty, "2.45098039"); // 250 / 102
        assert_eq!(sent[0].price, "102.00000000");
        assert_eq!(sent[0].time_in_force, "GTC");
        assert_eq!(order.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_limit_order_requires_price() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let err = service(mock)
            .execute_limit_order(limit_request("250", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_orders_get_fresh_local_ids() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let svc = service(mock);

        let first = svc.execute_market_order(market_request()).await.unwrap();
        let second = svc.execute_market_order(market_request()).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.exchange_id, second.exchange_id);
    }

    #[tokio::test]
    async fn test_exchange_failure_propagates() {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        mock.fail_all_creates();

        let err = service(mock)
            .execute_market_order(market_request())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Exchange(_)));
    }
}
