//! Trade endpoints and the exchange webhook.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use cryptorg_core::constants::EXCHANGE_STATUS_FILLED;
use cryptorg_core::TradeConfig;
use cryptorg_engine::EngineError;

use crate::response::{message, ApiError};
use crate::routes::AppState;

pub async fn initialize_trade(
    State(state): State<AppState>,
    Json(config): Json<TradeConfig>,
) -> Result<impl IntoResponse, ApiError> {
    if config.symbol.is_empty() || config.entry_volume.is_empty() || config.dca_volume.is_empty() {
        return Err(ApiError::bad_request(
            "Symbol, entry volume and DCA volume are required",
        ));
    }
    if config.dca_count == 0 || config.dca_step_percent <= 0.0 || config.take_profit_percent <= 0.0
    {
        return Err(ApiError::bad_request(
            "DCA count, step percent and take profit percent must be positive",
        ));
    }

    match state.trades.initialize_trade(config).await {
        Ok(init) => {
            if !init.failures.is_empty() {
                warn!(
                    trade_id = %init.trade.id,
                    failures = init.failures.len(),
                    "Trade initialized with unplaced legs"
                );
            }
            Ok((StatusCode::CREATED, Json(init.trade)))
        }
        Err(EngineError::Validation(reason)) => Err(ApiError::bad_request(reason)),
        Err(e) => {
            error!(error = %e, "Failed to initialize trade");
            Err(ApiError::internal("Failed to initialize trade"))
        }
    }
}

pub async fn get_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;

    match state.trades.get_trade(trade_id) {
        Ok(trade) => Ok((StatusCode::OK, Json(trade))),
        Err(_) => Err(ApiError::not_found("Trade not found")),
    }
}

pub async fn get_all_trades(State(state): State<AppState>) -> impl IntoResponse {
    let trades = state.trades.get_all_trades();
    (
        StatusCode::OK,
        Json(json!({
            "count": trades.len(),
            "trades": trades,
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct OrderFilledBody {
    #[serde(default)]
    pub order_id: String,
}

pub async fn process_order_execution(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    Json(body): Json<OrderFilledBody>,
) -> Result<impl IntoResponse, ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;
    if body.order_id.is_empty() {
        return Err(ApiError::bad_request("Order ID is required"));
    }

    match state
        .trades
        .process_order_execution(trade_id, &body.order_id)
        .await
    {
        Ok(()) => Ok(message("Order execution processed successfully")),
        Err(e) => {
            error!(trade_id = %trade_id, order_id = %body.order_id, error = %e, "Failed to process order execution");
            Err(ApiError::internal("Failed to process order execution"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloseTradeBody {
    #[serde(default)]
    pub reason: String,
}

pub async fn close_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    Json(body): Json<CloseTradeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let trade_id = parse_trade_id(&trade_id)?;
    let reason = if body.reason.is_empty() {
        "Manual close"
    } else {
        body.reason.as_str()
    };

    match state.trades.close_trade(trade_id, reason).await {
        Ok(()) => Ok(message("Trade closed successfully")),
        Err(e) => {
            error!(trade_id = %trade_id, error = %e, "Failed to close trade");
            Err(ApiError::internal("Failed to close trade"))
        }
    }
}

/// Exchange order-update payload, short keys as Bybit sends them.
#[derive(Debug, Deserialize)]
pub struct WebhookOrderUpdate {
    /// Event type.
    #[serde(rename = "e", default)]
    pub event_type: String,
    /// Symbol.
    #[serde(rename = "s", default)]
    pub symbol: String,
    /// Exchange order id.
    #[serde(rename = "i", default)]
    pub order_id: String,
    /// Order status.
    #[serde(rename = "X", default)]
    pub status: String,
    /// Side.
    #[serde(rename = "S", default)]
    pub side: String,
    /// Order type.
    #[serde(rename = "o", default)]
    pub order_type: String,
}

/// Webhook ingress. Always acknowledged with 200; the exchange does not
/// retry, so processing failures are logged rather than surfaced.
pub async fn webhook_order_update(
    State(state): State<AppState>,
    Json(update): Json<WebhookOrderUpdate>,
) -> Response {
    if update.status != EXCHANGE_STATUS_FILLED {
        return message("Webhook processed");
    }

    let trade = match state.trades.find_trade_by_order_id(&update.order_id) {
        Ok(trade) => trade,
        Err(_) => return message("Order not found"),
    };

    if trade.entry_order.exchange_id == update.order_id {
        // The entry is a market order, already treated as filled when the
        // trade was opened; nothing to process.
        info!(trade_id = %trade.id, "Entry fill acknowledged");
    } else if let Err(e) = state
        .trades
        .process_order_execution(trade.id, &update.order_id)
        .await
    {
        warn!(
            trade_id = %trade.id,
            order_id = %update.order_id,
            error = %e,
            "Failed to process webhook fill"
        );
    }

    message("Webhook processed")
}

fn parse_trade_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid trade ID format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use cryptorg_engine::{OrderService, TradeEngine};
    use cryptorg_exchange::MockExchange;
    use serde_json::Value;
    use std::sync::Arc;

    fn state() -> (Arc<MockExchange>, AppState) {
        let mock = Arc::new(MockExchange::new("100.00000000"));
        let orders = Arc::new(OrderService::new(mock.clone()));
        let trades = Arc::new(TradeEngine::new(orders.clone()));
        (mock, AppState::new(orders, trades))
    }

    fn config() -> TradeConfig {
        TradeConfig {
            symbol: "SOLUSDT".to_string(),
            entry_volume: "100".to_string(),
            dca_step_percent: 1.0,
            dca_volume: "50".to_string(),
            dca_count: 3,
            take_profit_percent: 2.0,
            martingale: 1.0,
            dynamic_step: false,
        }
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn expect_err<T>(result: Result<T, ApiError>) -> ApiError {
        match result {
            Ok(_) => panic!("expected an error response"),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn test_initialize_trade_created() {
        let (_, state) = state();
        let resp = initialize_trade(State(state), Json(config()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["dca_orders"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_initialize_trade_validates_body() {
        let (mock, state) = state();

        let mut cfg = config();
        cfg.symbol = String::new();
        let err = expect_err(initialize_trade(State(state.clone()), Json(cfg)).await);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut cfg = config();
        cfg.dca_count = 0;
        let err = expect_err(initialize_trade(State(state), Json(cfg)).await);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        assert!(mock.create_requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_trade_rejects_bad_uuid() {
        let (_, state) = state();
        let err = expect_err(get_trade(State(state), Path("not-a-uuid".to_string())).await);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_trade_unknown_is_404() {
        let (_, state) = state();
        let err = expect_err(get_trade(State(state), Path(Uuid::new_v4().to_string())).await);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_all_trades_reports_count() {
        let (_, state) = state();
        initialize_trade(State(state.clone()), Json(config()))
            .await
            .unwrap();

        let resp = get_all_trades(State(state)).await.into_response();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["trades"].as_array().unwrap().len(), 1);
    }

    fn webhook(order_id: &str, status: &str) -> WebhookOrderUpdate {
        WebhookOrderUpdate {
            event_type: "executionReport".to_string(),
            symbol: "SOLUSDT".to_string(),
            order_id: order_id.to_string(),
            status: status.to_string(),
            side: "BUY".to_string(),
            order_type: "LIMIT".to_string(),
        }
    }

    #[tokio::test]
    async fn test_webhook_ignores_non_filled_status() {
        let (_, state) = state();
        let resp = webhook_order_update(State(state), Json(webhook("any", "New"))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["message"], "Webhook processed");
    }

    #[tokio::test]
    async fn test_webhook_unknown_order_acknowledged() {
        let (_, state) = state();
        let resp = webhook_order_update(State(state), Json(webhook("nope", "Filled"))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["message"], "Order not found");
    }

    #[tokio::test]
    async fn test_webhook_entry_fill_is_acknowledged_only() {
        let (mock, state) = state();
        let resp = initialize_trade(State(state.clone()), Json(config()))
            .await
            .unwrap()
            .into_response();
        let trade = body_json(resp).await;
        let entry_id = trade["entry_order"]["exchange_id"].as_str().unwrap();

        let placed_before = mock.create_requests().len();
        let resp =
            webhook_order_update(State(state), Json(webhook(entry_id, "Filled"))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // No take-profit re-pricing happened.
        assert_eq!(mock.create_requests().len(), placed_before);
    }

    #[tokio::test]
    async fn test_close_trade_flow() {
        let (_, state) = state();
        let resp = initialize_trade(State(state.clone()), Json(config()))
            .await
            .unwrap()
            .into_response();
        let trade = body_json(resp).await;
        let trade_id = trade["id"].as_str().unwrap().to_string();

        let resp = close_trade(
            State(state.clone()),
            Path(trade_id.clone()),
            Json(CloseTradeBody {
                reason: String::new(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_trade(State(state), Path(trade_id))
            .await
            .unwrap()
            .into_response();
        let json = body_json(resp).await;
        assert_eq!(json["status"], "CANCELLED");
    }

    #[tokio::test]
    async fn test_close_unknown_trade_is_internal_error() {
        let (_, state) = state();
        let err = expect_err(
            close_trade(
                State(state),
                Path(Uuid::new_v4().to_string()),
                Json(CloseTradeBody {
                    reason: "x".to_string(),
                }),
            )
            .await,
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_process_order_execution_requires_order_id() {
        let (_, state) = state();
        let err = expect_err(
            process_order_execution(
                State(state),
                Path(Uuid::new_v4().to_string()),
                Json(OrderFilledBody {
                    order_id: String::new(),
                }),
            )
            .await,
        );
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
