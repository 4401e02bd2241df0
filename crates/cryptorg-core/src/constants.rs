//! Trading constants shared across the system.

/// Martingale multiplier applied when the config leaves it unset or non-positive.
pub const DEFAULT_MARTINGALE: f64 = 1.0;

/// Time-in-force sent with every limit order.
pub const DEFAULT_TIME_IN_FORCE: &str = "GTC";

/// Fractional digits of every price/quantity string on the wire.
pub const PRICE_PRECISION: u32 = 8;

/// Upper bound on the number of DCA safety orders per trade.
pub const MAX_SAFETY_ORDERS: u32 = 20;

/// Position-size guards (USDT notional / base quantity).
pub const MAX_POSITION_VALUE: f64 = 100_000.0;
pub const MIN_ORDER_SIZE: f64 = 0.001;
pub const MAX_ORDER_SIZE: f64 = 1_000.0;

/// Accepted trading-pair shape: 3-10 uppercase letters quoted in USDT.
pub const SYMBOL_PATTERN: &str = "^[A-Z]{3,10}USDT$";

/// Bounds for grid-step and take-profit percentages.
pub const MIN_PRICE_STEP: f64 = 0.1;
pub const MAX_PRICE_STEP: f64 = 50.0;
pub const MIN_PROFIT_STEP: f64 = 0.1;
pub const MAX_PROFIT_STEP: f64 = 100.0;

/// Webhook event type carrying order execution reports.
pub const WEBHOOK_EVENT_ORDER_UPDATE: &str = "executionReport";

/// Order statuses as Bybit spells them on the wire.
pub const EXCHANGE_STATUS_FILLED: &str = "Filled";
pub const EXCHANGE_STATUS_NEW: &str = "New";
pub const EXCHANGE_STATUS_CANCELLED: &str = "Cancelled";
