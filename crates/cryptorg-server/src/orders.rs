//! Order endpoints: placement, cancellation, status, price calculators.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use cryptorg_core::{dca_price, take_profit_price, CreateOrderRequest, OrderSide, OrderType};

use crate::response::{message, ApiError};
use crate::routes::AppState;

/// Request body for the market/limit order endpoints. The order type is
/// forced by the route, never trusted from the body.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    #[serde(default)]
    pub symbol: String,
    pub side: OrderSide,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub price: String,
}

pub async fn execute_market_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.symbol.is_empty() || body.quantity.is_empty() {
        return Err(ApiError::bad_request("Symbol and quantity are required"));
    }

    let req = CreateOrderRequest {
        symbol: body.symbol,
        side: body.side,
        order_type: OrderType::Market,
        quantity: body.quantity,
        price: String::new(),
    };

    match state.orders.execute_market_order(req).await {
        Ok(order) => Ok((StatusCode::CREATED, Json(order))),
        Err(e) => {
            error!(error = %e, "Failed to execute market order");
            Err(ApiError::internal("Failed to execute market order"))
        }
    }
}

pub async fn execute_limit_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.symbol.is_empty() || body.quantity.is_empty() || body.price.is_empty() {
        return Err(ApiError::bad_request(
            "Symbol, quantity and price are required",
        ));
    }

    let req = CreateOrderRequest {
        symbol: body.symbol,
        side: body.side,
        order_type: OrderType::Limit,
        quantity: body.quantity,
        price: body.price,
    };

    match state.orders.execute_limit_order(req).await {
        Ok(order) => Ok((StatusCode::CREATED, Json(order))),
        Err(e) => {
            error!(error = %e, "Failed to execute limit order");
            Err(ApiError::internal("Failed to execute limit order"))
        }
    }
}

pub async fn terminate_order(
    State(state): State<AppState>,
    Path((symbol, order_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    match state.orders.terminate_order(&symbol, &order_id).await {
        Ok(()) => Ok(message("Order terminated successfully")),
        Err(e) => {
            error!(symbol = %symbol, order_id = %order_id, error = %e, "Failed to terminate order");
            Err(ApiError::internal("Failed to terminate order"))
        }
    }
}

pub async fn fetch_order_status(
    State(state): State<AppState>,
    Path((symbol, order_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    match state.orders.fetch_order_status(&symbol, &order_id).await {
        Ok(order) => Ok((StatusCode::OK, Json(order))),
        Err(e) => {
            error!(symbol = %symbol, order_id = %order_id, error = %e, "Failed to fetch order status");
            Err(ApiError::internal("Failed to fetch order status"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalculateTakeProfitBody {
    #[serde(default)]
    pub entry_price: String,
    #[serde(default)]
    pub profit_percent: f64,
    #[serde(default)]
    pub side: String,
}

pub async fn compute_take_profit(
    Json(body): Json<CalculateTakeProfitBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.entry_price.is_empty() || body.profit_percent <= 0.0 || body.side.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let side = parse_side(&body.side);
    match take_profit_price(&body.entry_price, body.profit_percent, side) {
        Ok(tp_price) => Ok((
            StatusCode::OK,
            Json(json!({
                "entry_price": body.entry_price,
                "profit_percent": body.profit_percent,
                "side": body.side,
                "take_profit_price": tp_price,
            })),
        )),
        Err(e) => {
            error!(error = %e, "Failed to compute take profit price");
            Err(ApiError::internal("Failed to compute take profit price"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalculateDcaBody {
    #[serde(default)]
    pub current_price: String,
    #[serde(default)]
    pub step_percent: f64,
    #[serde(default)]
    pub side: String,
}

pub async fn compute_dca_price(
    Json(body): Json<CalculateDcaBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.current_price.is_empty() || body.step_percent <= 0.0 || body.side.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let side = parse_side(&body.side);
    match dca_price(&body.current_price, body.step_percent, side) {
        Ok(price) => Ok((
            StatusCode::OK,
            Json(json!({
                "current_price": body.current_price,
                "step_percent": body.step_percent,
                "side": body.side,
                "dca_price": price,
            })),
        )),
        Err(e) => {
            error!(error = %e, "Failed to compute DCA price");
            Err(ApiError::internal("Failed to compute DCA price"))
        }
    }
}

/// Anything that is not a buy computes with the sell formula.
fn parse_side(side: &str) -> OrderSide {
    if side == OrderSide::Buy.as_str() {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    }
}
