//! Trade lifecycle orchestration.
//!
//! The engine owns every active trade and the reverse index from
//! exchange-assigned order ids to trade ids. Both live behind a single
//! `RwLock` (the aggregate lock); exchange calls always happen outside
//! it, and state is mutated under it at well-defined checkpoints.
//! Mutations on trades that already reached a terminal status are no-ops,
//! so racing webhooks cannot resurrect a finished trade.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use cryptorg_core::arithmetic::{
    decimal_from_f64, format_decimal, parse_decimal, round_to_precision, take_profit_price,
};
use cryptorg_core::{
    CreateOrderRequest, Order, OrderSide, OrderStatus, OrderType, Trade, TradeConfig, TradeStatus,
};

use crate::error::{EngineError, EngineResult};
use crate::orders::OrderService;

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Which leg of a trade a placement failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeLeg {
    TakeProfit,
    /// A DCA rung, by zero-based rank in the grid.
    Dca(u32),
}

/// A non-fatal order placement failure during trade initialization.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementFailure {
    pub leg: TradeLeg,
    pub reason: String,
}

/// Result of trade initialization: the registered trade plus every leg
/// that could not be placed. Initialization only fails outright when the
/// entry order is rejected.
#[derive(Debug, Clone)]
pub struct TradeInit {
    pub trade: Trade,
    pub failures: Vec<PlacementFailure>,
}

/// Shared trade registry. Guarded as one unit so the index can never
/// disagree with the trades it points into.
#[derive(Default)]
struct Registry {
    trades: HashMap<Uuid, Trade>,
    order_index: HashMap<String, Uuid>,
}

impl Registry {
    fn index_trade(&mut self, trade: &Trade) {
        for order in trade.all_orders() {
            self.order_index
                .insert(order.exchange_id.clone(), trade.id);
        }
    }
}

/// Owns all active trades and drives their state machines.
pub struct TradeEngine {
    orders: Arc<OrderService>,
    registry: RwLock<Registry>,
}

impl TradeEngine {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self {
            orders,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Open a new DCA trade: market entry, initial take-profit, safety grid.
    ///
    /// An entry rejection aborts with nothing registered. Take-profit and
    /// DCA placements are best-effort; their failures are reported in the
    /// returned `TradeInit` and the trade is registered regardless.
    pub async fn initialize_trade(&self, config: TradeConfig) -> EngineResult<TradeInit> {
        let config = config.normalized();
        config
            .validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let entry_order = self
            .orders
            .execute_market_order(CreateOrderRequest {
                symbol: config.symbol.clone(),
                side: OrderSide::Buy,
                order_type: OrderType::Market,
                quantity: config.entry_volume.clone(),
                price: String::new(),
            })
            .await?;

        let entry_price = entry_order.price.clone();
        let now = Utc::now();
        let mut trade = Trade {
            id: Uuid::new_v4(),
            symbol: config.symbol.clone(),
            entry_order,
            dca_orders: Vec::new(),
            take_profit_order: None,
            status: TradeStatus::Active,
            total_invested: config.entry_volume.clone(),
            average_price: entry_price.clone(),
            current_price: entry_price,
            created_at: now,
            updated_at: now,
            config,
        };

        let mut failures = Vec::new();

        match self.place_initial_take_profit(&trade).await {
            Ok(tp) => trade.take_profit_order = Some(tp),
            Err(e) => {
                warn!(trade_id = %trade.id, error = %e, "Failed to place initial take-profit");
                failures.push(PlacementFailure {
                    leg: TradeLeg::TakeProfit,
                    reason: e.to_string(),
                });
            }
        }

        let (dca_orders, dca_failures) = self.place_dca_grid(&trade).await;
        trade.dca_orders = dca_orders;
        failures.extend(dca_failures);

        {
            let mut registry = self.registry.write();
            registry.index_trade(&trade);
            registry.trades.insert(trade.id, trade.clone());
        }

        info!(
            trade_id = %trade.id,
            symbol = %trade.symbol,
            dca_orders = trade.dca_orders.len(),
            failures = failures.len(),
            "Trade initialized"
        );

        Ok(TradeInit { trade, failures })
    }

    /// Place the initial take-profit, sized to the projected total volume
    /// assuming every DCA rung fills.
    ///
    /// The projection adds `dca_volume * martingale` once per rung off the
    /// base volume; it does not compound the multiplier the way per-rung
    /// placement does, so with martingale > 1 the initial take-profit is
    /// sized under the grid it guards.
    async fn place_initial_take_profit(&self, trade: &Trade) -> EngineResult<Order> {
        let config = &trade.config;
        let tp_price = take_profit_price(
            &trade.entry_order.price,
            config.take_profit_percent,
            OrderSide::Buy,
        )?;

        let mut total = parse_decimal(&config.entry_volume, "entry volume")?;
        let dca_volume = parse_decimal(&config.dca_volume, "DCA volume")?;
        let martingale = decimal_from_f64(config.martingale, "martingale")?;
        for _ in 0..config.dca_count {
            total += dca_volume * martingale;
        }

        self.orders
            .execute_limit_order(CreateOrderRequest {
                symbol: config.symbol.clone(),
                side: OrderSide::Sell,
                order_type: OrderType::Limit,
                quantity: format_decimal(total),
                price: tp_price,
            })
            .await
    }

    /// Place the DCA safety grid below the entry price.
    ///
    /// Failed rungs are skipped, so the grid can end up shorter than
    /// configured.
    async fn place_dca_grid(&self, trade: &Trade) -> (Vec<Order>, Vec<PlacementFailure>) {
        let config = &trade.config;

        let parsed = parse_decimal(&trade.entry_order.price, "entry price").and_then(|price| {
            Ok((
                price,
                parse_decimal(&config.dca_volume, "DCA volume")?,
                decimal_from_f64(config.dca_step_percent, "DCA step percent")?,
                decimal_from_f64(config.martingale, "martingale")?,
            ))
        });
        let (mut current_price, mut current_volume, step, martingale) = match parsed {
            Ok(values) => values,
            Err(e) => {
                warn!(trade_id = %trade.id, error = %e, "Cannot compute DCA grid");
                let failures = (0..config.dca_count)
                    .map(|rank| PlacementFailure {
                        leg: TradeLeg::Dca(rank),
                        reason: e.to_string(),
                    })
                    .collect();
                return (Vec::new(), failures);
            }
        };

        let mut orders = Vec::new();
        let mut failures = Vec::new();

        for rank in 0..config.dca_count {
            if config.dynamic_step {
                // The step grows with the rank AND re-anchors on the already
                // stepped-down running price, compounding twice.
                let scaled = step * Decimal::from(rank + 1);
                current_price *= Decimal::ONE - scaled / HUNDRED;
            } else {
                current_price *= Decimal::ONE - step / HUNDRED;
            }

            // The running volume picks up the multiplier before every
            // placement, the first rung included, and compounds off the
            // wire-rounded value.
            current_volume = round_to_precision(current_volume * martingale);

            let req = CreateOrderRequest {
                symbol: config.symbol.clone(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                quantity: format_decimal(current_volume),
                price: format_decimal(current_price),
            };

            match self.orders.execute_limit_order(req).await {
                Ok(order) => orders.push(order),
                Err(e) => {
                    warn!(
                        trade_id = %trade.id,
                        rank,
                        error = %e,
                        "Failed to place DCA order, skipping rung"
                    );
                    failures.push(PlacementFailure {
                        leg: TradeLeg::Dca(rank),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (orders, failures)
    }

    /// Process a fill notification for one of the trade's orders.
    ///
    /// A take-profit fill completes the trade; a DCA fill re-averages and
    /// re-prices the take-profit. Anything else is unknown to the trade.
    pub async fn process_order_execution(
        &self,
        trade_id: Uuid,
        order_id: &str,
    ) -> EngineResult<()> {
        let trade = {
            let registry = self.registry.read();
            registry.trades.get(&trade_id).cloned()
        }
        .ok_or_else(|| EngineError::not_found("trade", trade_id.to_string()))?;

        if trade.status.is_terminal() {
            info!(trade_id = %trade_id, status = ?trade.status, "Ignoring fill for terminal trade");
            return Ok(());
        }

        if trade
            .take_profit_order
            .as_ref()
            .is_some_and(|tp| tp.exchange_id == order_id)
        {
            info!(trade_id = %trade_id, "Take-profit filled, completing trade");
            return self.finalize_trade(trade_id, TradeStatus::Completed).await;
        }

        if let Some(rank) = trade
            .dca_orders
            .iter()
            .position(|o| o.exchange_id == order_id)
        {
            return self.handle_dca_execution(&trade, rank).await;
        }

        Err(EngineError::not_found("order", order_id))
    }

    /// A DCA rung filled: refresh it from the exchange, cancel the old
    /// take-profit, and place a new one at the re-averaged target.
    async fn handle_dca_execution(&self, trade: &Trade, rank: usize) -> EngineResult<()> {
        let dca = &trade.dca_orders[rank];
        let updated = self
            .orders
            .fetch_order_status(&dca.symbol, &dca.exchange_id)
            .await?;

        let mut dca_orders = trade.dca_orders.clone();
        dca_orders[rank] = updated.clone();

        // Best-effort: if the cancel fails the old order either already
        // terminated on the exchange or will be orphaned there; the new
        // take-profit still supersedes it locally.
        if let Some(tp) = &trade.take_profit_order {
            if let Err(e) = self
                .orders
                .terminate_order(&trade.symbol, &tp.exchange_id)
                .await
            {
                warn!(trade_id = %trade.id, error = %e, "Failed to cancel old take-profit");
            }
        }

        let (average_price, total_volume) = weighted_average(&trade.entry_order, &dca_orders)?;
        let tp_price = take_profit_target(average_price, trade.config.take_profit_percent)?;

        let new_tp = self
            .orders
            .execute_limit_order(CreateOrderRequest {
                symbol: trade.config.symbol.clone(),
                side: OrderSide::Sell,
                order_type: OrderType::Limit,
                quantity: total_volume,
                price: tp_price,
            })
            .await?;

        let stale = {
            let now = Utc::now();
            let mut registry = self.registry.write();
            let Registry {
                trades,
                order_index,
            } = &mut *registry;
            let Some(current) = trades.get_mut(&trade.id) else {
                return Err(EngineError::not_found("trade", trade.id.to_string()));
            };

            if current.status.is_terminal() {
                true
            } else {
                if let Some(slot) = current.dca_orders.get_mut(rank) {
                    if slot.exchange_id == updated.exchange_id {
                        *slot = updated;
                    }
                }
                if let Some(old_tp) = current.take_profit_order.take() {
                    order_index.remove(&old_tp.exchange_id);
                }
                order_index.insert(new_tp.exchange_id.clone(), current.id);
                current.average_price = format_decimal(average_price);
                current.updated_at = now;
                current.take_profit_order = Some(new_tp.clone());
                false
            }
        };

        if stale {
            // The trade was finalized while we were re-pricing; the fresh
            // take-profit must not be left resting on the exchange.
            warn!(trade_id = %trade.id, "Trade finalized during re-pricing, cancelling new take-profit");
            if let Err(e) = self
                .orders
                .terminate_order(&trade.symbol, &new_tp.exchange_id)
                .await
            {
                warn!(trade_id = %trade.id, error = %e, "Failed to cancel superfluous take-profit");
            }
            return Ok(());
        }

        info!(
            trade_id = %trade.id,
            average_price = %format_decimal(average_price),
            "Re-priced take-profit after DCA fill"
        );
        Ok(())
    }

    /// Close a trade manually. The reason is reported back to the caller
    /// but not persisted.
    pub async fn close_trade(&self, trade_id: Uuid, reason: &str) -> EngineResult<()> {
        {
            let registry = self.registry.read();
            if !registry.trades.contains_key(&trade_id) {
                return Err(EngineError::not_found("trade", trade_id.to_string()));
            }
        }

        info!(trade_id = %trade_id, reason, "Closing trade");
        self.finalize_trade(trade_id, TradeStatus::Cancelled).await
    }

    /// Move a trade to a terminal status, drop its orders from the reverse
    /// index, then best-effort cancel whatever is still resting.
    async fn finalize_trade(&self, trade_id: Uuid, status: TradeStatus) -> EngineResult<()> {
        let cancels = {
            let mut registry = self.registry.write();
            let Registry {
                trades,
                order_index,
            } = &mut *registry;
            let trade = trades
                .get_mut(&trade_id)
                .ok_or_else(|| EngineError::not_found("trade", trade_id.to_string()))?;

            if trade.status.is_terminal() {
                return Ok(());
            }
            trade.status = status;
            trade.updated_at = Utc::now();

            for order in trade.all_orders() {
                order_index.remove(&order.exchange_id);
            }

            let mut cancels: Vec<(String, String)> = trade
                .dca_orders
                .iter()
                .filter(|o| o.status == OrderStatus::New)
                .map(|o| (o.symbol.clone(), o.exchange_id.clone()))
                .collect();

            // A completed trade's take-profit just filled; only a manual
            // close can leave it resting on the book.
            if status == TradeStatus::Cancelled {
                if let Some(tp) = trade
                    .take_profit_order
                    .as_ref()
                    .filter(|tp| tp.status.is_open())
                {
                    cancels.push((tp.symbol.clone(), tp.exchange_id.clone()));
                }
            }

            cancels
        };

        for (symbol, exchange_id) in cancels {
            if let Err(e) = self.orders.terminate_order(&symbol, &exchange_id).await {
                warn!(
                    trade_id = %trade_id,
                    order_id = %exchange_id,
                    error = %e,
                    "Failed to cancel order during finalization"
                );
            }
        }

        info!(trade_id = %trade_id, status = ?status, "Trade finalized");
        Ok(())
    }

    /// Resolve an exchange order id to the trade that owns it.
    pub fn find_trade_by_order_id(&self, exchange_id: &str) -> EngineResult<Trade> {
        let registry = self.registry.read();
        let trade_id = registry
            .order_index
            .get(exchange_id)
            .ok_or_else(|| EngineError::not_found("order", exchange_id))?;
        registry
            .trades
            .get(trade_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("trade", trade_id.to_string()))
    }

    /// Snapshot of a single trade.
    pub fn get_trade(&self, trade_id: Uuid) -> EngineResult<Trade> {
        self.registry
            .read()
            .trades
            .get(&trade_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("trade", trade_id.to_string()))
    }

    /// Snapshot of every trade in the registry.
    pub fn get_all_trades(&self) -> Vec<Trade> {
        self.registry.read().trades.values().cloned().collect()
    }

    /// Number of exchange order ids currently in the reverse index.
    pub fn indexed_order_count(&self) -> usize {
        self.registry.read().order_index.len()
    }
}

/// Cost-weighted average entry price over the market entry plus every
/// filled DCA order, and the total volume as an 8-decimal string.
///
/// The entry contributes its requested quantity; DCA orders contribute
/// their executed quantity at their limit price. Unparseable DCA legs are
/// skipped.
fn weighted_average(entry: &Order, dca_orders: &[Order]) -> EngineResult<(Decimal, String)> {
    let entry_qty = parse_decimal(&entry.quantity, "entry quantity")?;
    let entry_price = parse_decimal(&entry.price, "entry price")?;

    let mut total_volume = entry_qty;
    let mut total_cost = entry_qty * entry_price;

    for order in dca_orders {
        if order.status != OrderStatus::Filled {
            continue;
        }
        let (Ok(qty), Ok(price)) = (
            parse_decimal(&order.executed_qty, "executed quantity"),
            parse_decimal(&order.price, "price"),
        ) else {
            continue;
        };
        total_volume += qty;
        total_cost += qty * price;
    }

    if total_volume.is_zero() {
        return Err(EngineError::Validation(
            "total filled volume is zero".to_string(),
        ));
    }

    Ok((total_cost / total_volume, format_decimal(total_volume)))
}

/// Take-profit price for a long position averaged at `average_price`.
fn take_profit_target(average_price: Decimal, profit_percent: f64) -> EngineResult<String> {
    let pct = decimal_from_f64(profit_percent, "take profit percent")?;
    Ok(format_decimal(
        average_price * (Decimal::ONE + pct / HUNDRED),
    ))
}
