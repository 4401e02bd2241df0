//! Bybit V5 REST client.
//!
//! Provides the signed HTTP client used to place, cancel and re-query
//! orders, the typed wire structs for those endpoints, and a scriptable
//! in-memory exchange for tests.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::BybitClient;
pub use error::{ExchangeError, ExchangeResult};
pub use mock::MockExchange;
pub use types::{ExchangeCancelRequest, ExchangeOrderRequest, ExchangeOrderResponse};

use async_trait::async_trait;

/// Exchange interface implemented by the live client and the mock.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Place an order. `POST /v5/order/create`.
    async fn execute_order(
        &self,
        req: ExchangeOrderRequest,
    ) -> ExchangeResult<ExchangeOrderResponse>;

    /// Cancel an order. `POST /v5/order/cancel`.
    async fn terminate_order(&self, req: ExchangeCancelRequest) -> ExchangeResult<()>;

    /// Re-query an order. `GET /v5/order/realtime`.
    async fn fetch_order_info(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> ExchangeResult<ExchangeOrderResponse>;
}
