//! Price and quantity arithmetic.
//!
//! All computations use `rust_decimal` for exact decimal math; every
//! exchange-facing value is a string with exactly 8 fractional digits,
//! rounded half-away-from-zero.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::PRICE_PRECISION;
use crate::error::{CoreError, Result};
use crate::order::OrderSide;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Parse a decimal string, attributing failures to `field`.
pub fn parse_decimal(value: &str, field: &'static str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| CoreError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

/// Round a decimal to the wire precision, half away from zero.
pub fn round_to_precision(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a decimal with exactly 8 fractional digits.
pub fn format_decimal(value: Decimal) -> String {
    let rounded = round_to_precision(value);
    format!("{rounded:.prec$}", prec = PRICE_PRECISION as usize)
}

/// Take-profit price for a position entered at `entry_price`.
///
/// Buys take profit above the entry, sells below it.
pub fn take_profit_price(entry_price: &str, profit_percent: f64, side: OrderSide) -> Result<String> {
    if entry_price.trim().is_empty() {
        return Err(CoreError::MissingField {
            field: "entry price",
        });
    }
    if profit_percent <= 0.0 {
        return Err(CoreError::NotPositive {
            field: "profit percent",
        });
    }

    let price = parse_decimal(entry_price, "entry price")?;
    if price <= Decimal::ZERO {
        return Err(CoreError::NotPositive {
            field: "entry price",
        });
    }
    let pct = decimal_from_f64(profit_percent, "profit percent")?;

    let tp = match side {
        OrderSide::Buy => price * (Decimal::ONE + pct / HUNDRED),
        OrderSide::Sell => price * (Decimal::ONE - pct / HUNDRED),
    };

    Ok(format_decimal(tp))
}

/// Price one DCA step away from `current_price`.
///
/// Buys ladder down, sells ladder up.
pub fn dca_price(current_price: &str, step_percent: f64, side: OrderSide) -> Result<String> {
    if current_price.trim().is_empty() {
        return Err(CoreError::MissingField {
            field: "current price",
        });
    }
    if step_percent <= 0.0 {
        return Err(CoreError::NotPositive {
            field: "step percent",
        });
    }

    let price = parse_decimal(current_price, "current price")?;
    if price <= Decimal::ZERO {
        return Err(CoreError::NotPositive {
            field: "current price",
        });
    }
    let pct = decimal_from_f64(step_percent, "step percent")?;

    let dca = match side {
        OrderSide::Buy => price * (Decimal::ONE - pct / HUNDRED),
        OrderSide::Sell => price * (Decimal::ONE + pct / HUNDRED),
    };

    Ok(format_decimal(dca))
}

/// Convert a USDT notional into a base-asset quantity at `price`.
pub fn quantity_from_usdt(usdt_amount: &str, price: &str) -> Result<String> {
    let usdt = parse_decimal(usdt_amount, "USDT amount")?;
    let price = parse_decimal(price, "price")?;

    if price <= Decimal::ZERO {
        return Err(CoreError::NotPositive { field: "price" });
    }

    Ok(format_decimal(usdt / price))
}

/// Convert an `f64` config parameter (percentages, multipliers) to a decimal.
pub fn decimal_from_f64(value: f64, field: &'static str) -> Result<Decimal> {
    Decimal::from_f64_retain(value).ok_or(CoreError::InvalidDecimal {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_pads_to_eight_digits() {
        assert_eq!(format_decimal(dec!(99)), "99.00000000");
        assert_eq!(format_decimal(dec!(97.0299)), "97.02990000");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_decimal(dec!(0.000000005)), "0.00000001");
        assert_eq!(format_decimal(dec!(99.666666666666)), "99.66666667");
    }

    #[test]
    fn test_take_profit_buy_above_entry() {
        let tp = take_profit_price("100.00000000", 2.0, OrderSide::Buy).unwrap();
        assert_eq!(tp, "102.00000000");
    }

    #[test]
    fn test_take_profit_sell_below_entry() {
        let tp = take_profit_price("100.00000000", 2.0, OrderSide::Sell).unwrap();
        assert_eq!(tp, "98.00000000");
    }

    #[test]
    fn test_take_profit_rejects_bad_input() {
        assert!(take_profit_price("", 2.0, OrderSide::Buy).is_err());
        assert!(take_profit_price("100", 0.0, OrderSide::Buy).is_err());
        assert!(take_profit_price("100", -1.0, OrderSide::Buy).is_err());
        assert!(take_profit_price("-100", 2.0, OrderSide::Buy).is_err());
        assert!(take_profit_price("abc", 2.0, OrderSide::Buy).is_err());
    }

    #[test]
    fn test_dca_buy_steps_down() {
        let dca = dca_price("100.00000000", 1.0, OrderSide::Buy).unwrap();
        assert_eq!(dca, "99.00000000");
    }

    #[test]
    fn test_dca_sell_steps_up() {
        let dca = dca_price("100.00000000", 1.0, OrderSide::Sell).unwrap();
        assert_eq!(dca, "101.00000000");
    }

    #[test]
    fn test_dca_rejects_bad_input() {
        assert!(dca_price("", 1.0, OrderSide::Buy).is_err());
        assert!(dca_price("100", 0.0, OrderSide::Buy).is_err());
        assert!(dca_price("0", 1.0, OrderSide::Buy).is_err());
    }

    #[test]
    fn test_quantity_from_usdt() {
        assert_eq!(quantity_from_usdt("100", "100").unwrap(), "1.00000000");
        assert_eq!(quantity_from_usdt("250", "102").unwrap(), "2.45098039");
    }

    #[test]
    fn test_quantity_rejects_non_positive_price() {
        assert!(quantity_from_usdt("100", "0").is_err());
        assert!(quantity_from_usdt("100", "-5").is_err());
        assert!(quantity_from_usdt("abc", "100").is_err());
    }

    /// TP then the reverse DCA step lands back near the original price.
    #[test]
    fn test_tp_then_dca_round_trip() {
        let entry = dec!(137.42);
        let pct = 2.5;

        let tp = take_profit_price(&format_decimal(entry), pct, OrderSide::Buy).unwrap();
        let back = dca_price(&tp, pct, OrderSide::Buy).unwrap();

        let back = parse_decimal(&back, "price").unwrap();
        // (1 + p)(1 - p) = 1 - p^2, so the deviation is bounded by p^2.
        let deviation = (back - entry).abs() / entry;
        assert!(deviation < dec!(0.001), "deviation {deviation}");
    }

    /// USDT -> base quantity -> USDT round-trips to 8-digit rounding.
    #[test]
    fn test_usdt_quantity_round_trip() {
        let qty = quantity_from_usdt("250.00000000", "102.00000000").unwrap();
        let qty = parse_decimal(&qty, "quantity").unwrap();
        let notional = qty * dec!(102);
        assert!((notional - dec!(250)).abs() < dec!(0.00001));
    }
}
