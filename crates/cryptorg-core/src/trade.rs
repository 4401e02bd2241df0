//! The trade aggregate and its configuration.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_MARTINGALE, MAX_SAFETY_ORDERS, SYMBOL_PATTERN};
use crate::error::{CoreError, Result};
use crate::order::Order;

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SYMBOL_PATTERN).expect("symbol pattern is a valid regex")
});

/// Immutable parameters of a DCA strategy instance.
///
/// Every field defaults on deserialization so a sparse request body
/// surfaces as a validation error instead of a decoding failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeConfig {
    #[serde(default)]
    pub symbol: String,
    /// USDT notional of the market entry.
    #[serde(default)]
    pub entry_volume: String,
    /// Base grid spacing in percent.
    #[serde(default)]
    pub dca_step_percent: f64,
    /// USDT notional of the first DCA order.
    #[serde(default)]
    pub dca_volume: String,
    #[serde(default)]
    pub dca_count: u32,
    #[serde(default)]
    pub take_profit_percent: f64,
    /// Rung-to-rung volume multiplier; non-positive values fall back to 1.0.
    #[serde(default)]
    pub martingale: f64,
    /// If true, each rung is offset from the entry by a step scaled with the
    /// rung index; otherwise the grid is a geometric ladder off the
    /// previous rung.
    #[serde(default)]
    pub dynamic_step: bool,
}

impl TradeConfig {
    /// Substitute the default martingale when the configured one is unusable.
    pub fn normalized(mut self) -> Self {
        if self.martingale <= 0.0 {
            self.martingale = DEFAULT_MARTINGALE;
        }
        self
    }

    /// Validate the parameters a trade can actually be opened with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(CoreError::MissingField { field: "symbol" });
        }
        if !SYMBOL_RE.is_match(&self.symbol) {
            return Err(CoreError::InvalidConfig(format!(
                "symbol {:?} must match {}",
                self.symbol, SYMBOL_PATTERN
            )));
        }
        if self.entry_volume.is_empty() {
            return Err(CoreError::MissingField {
                field: "entry volume",
            });
        }
        if self.dca_volume.is_empty() {
            return Err(CoreError::MissingField { field: "DCA volume" });
        }
        if self.dca_count == 0 {
            return Err(CoreError::NotPositive { field: "DCA count" });
        }
        if self.dca_count > MAX_SAFETY_ORDERS {
            return Err(CoreError::InvalidConfig(format!(
                "DCA count {} exceeds the maximum of {}",
                self.dca_count, MAX_SAFETY_ORDERS
            )));
        }
        if self.dca_step_percent <= 0.0 {
            return Err(CoreError::NotPositive {
                field: "DCA step percent",
            });
        }
        if self.take_profit_percent <= 0.0 {
            return Err(CoreError::NotPositive {
                field: "take profit percent",
            });
        }
        Ok(())
    }
}

/// Trade lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Active,
    Completed,
    Cancelled,
    Failed,
}

impl TradeStatus {
    /// Terminal trades are never mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// A single DCA strategy instance and every order it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub config: TradeConfig,
    /// The market entry; present for the whole life of the trade.
    pub entry_order: Order,
    /// Grid of safety orders, in placement order.
    pub dca_orders: Vec<Order>,
    /// The single live take-profit leg, replaced on each DCA fill.
    pub take_profit_order: Option<Order>,
    pub status: TradeStatus,
    pub total_invested: String,
    pub average_price: String,
    pub current_price: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Iterate over every order the trade currently holds.
    pub fn all_orders(&self) -> impl Iterator<Item = &Order> {
        std::iter::once(&self.entry_order)
            .chain(self.take_profit_order.iter())
            .chain(self.dca_orders.iter())
    }
}
