//! Trade orchestration for the cryptorg DCA bot.
//!
//! `OrderService` adapts domain order requests onto the exchange client;
//! `TradeEngine` owns every active trade, drives the initialization
//! protocol (entry, take-profit, DCA grid), re-averages the take-profit
//! as safety orders fill, and maintains the exchange-id reverse index
//! that webhook dispatch relies on.

pub mod error;
pub mod orders;
pub mod trades;

pub use error::{EngineError, EngineResult};
pub use orders::OrderService;
pub use trades::{PlacementFailure, TradeEngine, TradeInit, TradeLeg};
