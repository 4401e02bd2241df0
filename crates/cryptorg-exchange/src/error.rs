//! Exchange error types.

use thiserror::Error;

/// Errors surfaced by the exchange client.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange answered with a non-200 status.
    #[error("bybit API error: status {status}, body: {body}")]
    Api { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode exchange response: {0}")]
    Decode(String),

    /// `GET /v5/order/realtime` returned an empty list.
    #[error("order not found")]
    OrderNotFound,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
