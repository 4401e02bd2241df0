//! HTTP surface of the cryptorg bot.
//!
//! Thin request adapters over the trade engine and order service:
//! validate inputs, dispatch, serialize. Routing, CORS and the error
//! mapping live in this crate; all trading behavior lives below it.

pub mod orders;
pub mod response;
pub mod routes;
pub mod trades;

pub use routes::{create_router, AppState};
