//! Order entities and trading enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status in the domain model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Filled,
    PartiallyFilled,
    Canceled,
}

impl OrderStatus {
    /// Map an exchange-reported status string onto the domain enum.
    ///
    /// Bybit spells statuses in PascalCase ("New", "PartiallyFilled",
    /// "Cancelled"); the canonical uppercase spellings are accepted too.
    /// Unknown strings map to `New` so a surprising exchange value never
    /// fabricates a fill.
    pub fn from_exchange(status: &str) -> Self {
        match status {
            "Filled" | "FILLED" => Self::Filled,
            "PartiallyFilled" | "PARTIALLY_FILLED" => Self::PartiallyFilled,
            "Cancelled" | "Canceled" | "CANCELED" => Self::Canceled,
            _ => Self::New,
        }
    }

    /// Returns true while the order can still rest on the book.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::PartiallyFilled)
    }
}

/// An order placed on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Locally-generated identifier.
    pub id: Uuid,
    /// Identifier assigned by the exchange on acceptance.
    pub exchange_id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Requested amount, 8-decimal string.
    pub quantity: String,
    /// Limit price, 8-decimal string; empty for market orders.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
    pub status: OrderStatus,
    /// Amount actually filled, 8-decimal string.
    pub executed_qty: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A domain-level request to place an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_round_trip() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(
            serde_json::to_string(&OrderSide::Buy).unwrap(),
            "\"BUY\""
        );
        let side: OrderSide = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, OrderSide::Sell);
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PartiallyFilled).unwrap(),
            "\"PARTIALLY_FILLED\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
    }

    #[test]
    fn test_status_from_exchange() {
        assert_eq!(OrderStatus::from_exchange("Filled"), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_exchange("New"), OrderStatus::New);
        assert_eq!(
            OrderStatus::from_exchange("PartiallyFilled"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(
            OrderStatus::from_exchange("Cancelled"),
            OrderStatus::Canceled
        );
        assert_eq!(OrderStatus::from_exchange("Untriggered"), OrderStatus::New);
    }

    #[test]
    fn test_status_is_open() {
        assert!(OrderStatus::New.is_open());
        assert!(OrderStatus::PartiallyFilled.is_open());
        assert!(!OrderStatus::Filled.is_open());
        assert!(!OrderStatus::Canceled.is_open());
    }
}
