//! Router assembly and cross-cutting middleware.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

use cryptorg_engine::{OrderService, TradeEngine};

use crate::{orders, trades};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub trades: Arc<TradeEngine>,
}

impl AppState {
    pub fn new(orders: Arc<OrderService>, trades: Arc<TradeEngine>) -> Self {
        Self { orders, trades }
    }
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/orders/market", post(orders::execute_market_order))
        .route("/api/orders/limit", post(orders::execute_limit_order))
        .route(
            "/api/orders/:symbol/:orderId",
            delete(orders::terminate_order).get(orders::fetch_order_status),
        )
        .route("/api/orders/calculate-tp", post(orders::compute_take_profit))
        .route("/api/orders/calculate-dca", post(orders::compute_dca_price))
        .route(
            "/api/trades",
            post(trades::initialize_trade).get(trades::get_all_trades),
        )
        .route("/api/trades/:tradeId", get(trades::get_trade))
        .route(
            "/api/trades/:tradeId/order-filled",
            post(trades::process_order_execution),
        )
        .route("/api/trades/:tradeId/close", post(trades::close_trade))
        .route("/api/webhook/order-update", post(trades::webhook_order_update))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "cryptorg-bot" })),
    )
        .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested resource was not found"
        })),
    )
        .into_response()
}

/// Permissive CORS on every response; preflights short-circuit to 204.
async fn cors(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(&mut resp);
        return resp;
    }

    let mut resp = next.run(req).await;
    apply_cors_headers(&mut resp);
    resp
}

fn apply_cors_headers(resp: &mut Response) {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "Origin, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization",
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_ok() {
        let resp = health().await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fallback_is_not_found() {
        let resp = not_found().await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_headers_applied() {
        let mut resp = StatusCode::OK.into_response();
        apply_cors_headers(&mut resp);

        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS),
            Some(&HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"))
        );
    }
}
