//! Core domain types for the cryptorg DCA trading bot.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `Order`, `CreateOrderRequest`: exchange order entities
//! - `Trade`, `TradeConfig`: the DCA strategy aggregate and its parameters
//! - Price/quantity arithmetic with the 8-decimal wire format
//! - Trading constants shared across crates

pub mod arithmetic;
pub mod constants;
pub mod error;
pub mod order;
pub mod trade;

pub use arithmetic::{dca_price, format_decimal, parse_decimal, quantity_from_usdt, take_profit_price};
pub use error::{CoreError, Result};
pub use order::{CreateOrderRequest, Order, OrderSide, OrderStatus, OrderType};
pub use trade::{Trade, TradeConfig, TradeStatus};
