//! The Simulator: a deterministic order/position state machine driven by
//! price bars.
//!
//! All mutation happens through `add_order` and `next` from a single
//! owner. The simulator holds no synchronization primitives and is not
//! meant for concurrent callers; concurrency lives a layer up, where many
//! independent simulators run in parallel.
//!
//! Order and position lifecycles are explicit transition loops: each pass
//! applies at most one state change and loops until the entity settles,
//! so the full transition sequence is auditable step by step.

use std::collections::BTreeMap;

use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::clock::Clock;
use crate::cost::Coster;
use crate::domain::{
    AccountBalance, EquitySeries, Kline, Order, OrderId, OrderState, OrderType, Position,
    PositionId, PositionState, RoundTurn, Side,
};

/// Errors surfaced by `add_order` and `next`.
///
/// Failures are local to one order or one position transition. A rejected
/// order's economic effect is void; the caller decides whether to submit
/// a corrected order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    /// Malformed or out-of-state order submitted. Caller error, never
    /// retried by the simulator.
    #[error("invalid order state: {0}")]
    InvalidOrderState(String),

    /// Economically invalid transition: a reduce-only order opening a
    /// position, or an order that would flip a position negative.
    #[error("rejected order: {0}")]
    RejectedOrder(String),
}

/// Simulator tuning knobs.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Spacing between intra-bar clock ticks. Must stay small relative to
    /// the bar interval so ticks never spill past the next epoch.
    pub tock_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tock_interval: Duration::milliseconds(1),
        }
    }
}

/// Outcome of one pass of a transition loop.
enum Step {
    Settled,
    Again,
    Finalize,
}

pub struct Simulator {
    clock: Clock,
    started: bool,
    coster: Box<dyn Coster>,
    balance: AccountBalance,
    last_price: Option<Kline>,
    orders: Vec<Order>,
    open_positions: BTreeMap<String, Position>,
    closed_positions: Vec<Position>,
    round_turns: Vec<RoundTurn>,
    equity: EquitySeries,
}

impl Simulator {
    pub fn new(coster: Box<dyn Coster>) -> Self {
        Self::with_config(coster, SimulatorConfig::default())
    }

    pub fn with_config(coster: Box<dyn Coster>, config: SimulatorConfig) -> Self {
        Self {
            clock: Clock::new(config.tock_interval),
            started: false,
            coster,
            balance: AccountBalance::default(),
            last_price: None,
            orders: Vec::new(),
            open_positions: BTreeMap::new(),
            closed_positions: Vec::new(),
            round_turns: Vec::new(),
            equity: EquitySeries::new(),
        }
    }

    /// Set the starting realized balance. Call before the first price bar
    /// so the equity series starts from the right base.
    pub fn set_initial_capital(&mut self, amount: Decimal) {
        self.balance.trade = amount;
        self.balance.equity = amount;
    }

    /// Accept a new order and immediately attempt processing; a market
    /// order against a live price can open, fill, and close within this
    /// call. Returns the updated order.
    pub fn add_order(&mut self, mut order: Order) -> Result<Order, SimulatorError> {
        if order.state() != OrderState::Pending {
            return Err(SimulatorError::InvalidOrderState(format!(
                "order must be pending, got {:?}",
                order.state()
            )));
        }
        if order.side.is_none() {
            return Err(SimulatorError::InvalidOrderState(
                "order side is unset".into(),
            ));
        }
        if order.order_type.is_none() {
            return Err(SimulatorError::InvalidOrderState(
                "order type is unset".into(),
            ));
        }
        if order.size <= Decimal::ZERO {
            return Err(SimulatorError::InvalidOrderState(format!(
                "order size must be strictly positive, got {}",
                order.size
            )));
        }

        let result = self.process_order(&mut order);
        self.orders.push(order.clone());
        result.map(|()| order)
    }

    /// Advance the simulation by one bar: start the clock on first call,
    /// move the epoch to the bar boundary, re-process every resting order
    /// against the new price, then mark open positions to market and
    /// append one equity entry.
    ///
    /// The bar routine always runs to completion; the first order-level
    /// failure is reported after the equity entry is written, so one bad
    /// resting order cannot corrupt the bar.
    pub fn next(&mut self, kline: &Kline) -> Result<(), SimulatorError> {
        if !self.started {
            self.clock.start(kline.start);
            self.started = true;
        }
        self.clock.advance(kline.start);
        self.last_price = Some(kline.clone());

        let mut first_error = None;
        for index in 0..self.orders.len() {
            if self.orders[index].state() != OrderState::Open {
                continue;
            }
            let mut order = self.orders[index].clone();
            let result = self.process_order(&mut order);
            self.orders[index] = order;
            if let Err(error) = result {
                first_error.get_or_insert(error);
            }
        }

        self.mark_to_market(kline);

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Close every currently open order by timestamp and return them.
    /// Pending, filled, and closed orders are untouched.
    pub fn cancel_orders(&mut self) -> Vec<Order> {
        let mut cancelled = Vec::new();
        for order in &mut self.orders {
            if order.state() == OrderState::Open {
                order.closed_at = Some(self.clock.now());
                cancelled.push(order.clone());
            }
        }
        cancelled
    }

    /// Full order history, defensively copied.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.clone()
    }

    /// Full position history (closed first, then live), defensively
    /// copied.
    pub fn positions(&self) -> Vec<Position> {
        let mut all = self.closed_positions.clone();
        all.extend(self.open_positions.values().cloned());
        all
    }

    /// The live position for `asset`, if any.
    pub fn open_position(&self, asset: &str) -> Option<&Position> {
        self.open_positions.get(asset)
    }

    /// Realized round-turn history, defensively copied.
    pub fn round_turns(&self) -> Vec<RoundTurn> {
        self.round_turns.clone()
    }

    /// The equity series, defensively copied.
    pub fn equity_history(&self) -> EquitySeries {
        self.equity.clone()
    }

    /// Current balance snapshot.
    pub fn balance(&self) -> AccountBalance {
        self.balance
    }

    // ─── Order transition loop ──────────────────────────────────────────

    fn process_order(&mut self, order: &mut Order) -> Result<(), SimulatorError> {
        loop {
            match order.state() {
                OrderState::Pending => {
                    let at = self.clock.now();
                    order.id = OrderId::from_instant(at);
                    order.opened_at = Some(at);
                }
                OrderState::Open => {
                    let Some(base_price) = self.match_price(order) else {
                        return Ok(());
                    };
                    self.fill(order, base_price)?;
                }
                OrderState::Filled => {
                    let side = order.side.ok_or_else(|| {
                        SimulatorError::InvalidOrderState("order side is unset".into())
                    })?;
                    self.apply_to_position(order, side)?;
                    order.closed_at = Some(self.clock.now());
                }
                OrderState::Closed => return Ok(()),
            }
        }
    }

    /// The price this order would fill at against the current bar, if any.
    ///
    /// Market orders always match the bar close. Limit orders match their
    /// limit price when it lies within the bar's range, but never on the
    /// bar they were opened in: an order opened at or after the current
    /// epoch must wait for a later bar. That guard is what keeps limit
    /// fills free of look-ahead.
    fn match_price(&self, order: &Order) -> Option<Decimal> {
        let kline = self.last_price.as_ref()?;
        match order.order_type? {
            OrderType::Market => Some(kline.close),
            OrderType::Limit => {
                let opened_at = order.opened_at?;
                if opened_at >= self.clock.epoch() {
                    return None;
                }
                kline.contains(order.limit_price).then_some(order.limit_price)
            }
        }
    }

    /// Stamp the fill: slippage first, then spread on the slippage-adjusted
    /// price, both added for buys and subtracted for sells, then the fee.
    fn fill(&mut self, order: &mut Order, base_price: Decimal) -> Result<(), SimulatorError> {
        let side = order
            .side
            .ok_or_else(|| SimulatorError::InvalidOrderState("order side is unset".into()))?;

        let slipped = match side {
            Side::Buy => base_price + self.coster.slippage(base_price),
            Side::Sell => base_price - self.coster.slippage(base_price),
        };
        let filled_price = match side {
            Side::Buy => slipped + self.coster.spread(slipped),
            Side::Sell => slipped - self.coster.spread(slipped),
        };

        order.filled_price = filled_price;
        order.filled_size = order.size;
        order.fee = self.coster.transaction(order);
        order.filled_at = Some(self.clock.now());
        Ok(())
    }

    // ─── Position transition loop ───────────────────────────────────────

    fn apply_to_position(&mut self, order: &Order, side: Side) -> Result<(), SimulatorError> {
        loop {
            if !self.open_positions.contains_key(&order.asset) {
                if order.reduce_only {
                    return Err(SimulatorError::RejectedOrder(format!(
                        "reduce-only order {} cannot open a position in {}",
                        order.id, order.asset
                    )));
                }
                let filled_at = order.filled_at.ok_or_else(|| {
                    SimulatorError::InvalidOrderState("order has no fill stamp".into())
                })?;
                let mut position = Position {
                    id: PositionId::from(order.id),
                    opened_at: Some(filled_at),
                    closed_at: None,
                    asset: order.asset.clone(),
                    side,
                    cost: Decimal::ZERO,
                    size: Decimal::ZERO,
                    entry_price: Decimal::ZERO,
                    exit_price: Decimal::ZERO,
                    mark_price: order.filled_price,
                    pnl: Decimal::ZERO,
                    trade_count: 0,
                };
                Self::adjust(&mut position, order, side);
                self.open_positions.insert(order.asset.clone(), position);
                continue;
            }

            let step = match self.open_positions.get_mut(&order.asset) {
                None => Step::Settled,
                Some(position) => match position.state() {
                    PositionState::Open => {
                        if position.id == PositionId::from(order.id) {
                            // The order that opened this position; already
                            // incorporated.
                            Step::Settled
                        } else {
                            if side != position.side && order.filled_size > position.size {
                                return Err(SimulatorError::RejectedOrder(format!(
                                    "order {} would flip position {}: filled size {} exceeds remaining size {}",
                                    order.id, position.id, order.filled_size, position.size
                                )));
                            }
                            Self::adjust(position, order, side);
                            if position.size == Decimal::ZERO {
                                position.closed_at = order.filled_at;
                                position.exit_price = order.filled_price;
                                Step::Again
                            } else {
                                Step::Settled
                            }
                        }
                    }
                    PositionState::Closed => Step::Finalize,
                    PositionState::Pending => Step::Settled,
                },
            };

            match step {
                Step::Settled => return Ok(()),
                Step::Again => continue,
                Step::Finalize => return self.finalize_position(&order.asset, order.filled_price),
            }
        }
    }

    /// Apply an order's size and cost to a position. Same-side orders add
    /// notional; opposite-side orders subtract it; fees always add.
    fn adjust(position: &mut Position, order: &Order, side: Side) {
        let notional = order.filled_price * order.filled_size;
        if side == position.side {
            position.cost += notional;
            position.size += order.filled_size;
        } else {
            position.cost -= notional;
            position.size -= order.filled_size;
        }
        position.cost += order.fee;
        position.trade_count += 1;
        position.entry_price = position.cost.abs() / position.size.max(Decimal::ONE);
    }

    /// Realize a closed position: mark it at the closing order's fill
    /// price (not the bar close, so limit exits realize at their actual
    /// level), cut the round turn, and land the profit in the trade
    /// balance.
    fn finalize_position(&mut self, asset: &str, fill_price: Decimal) -> Result<(), SimulatorError> {
        let Some(mut position) = self.open_positions.remove(asset) else {
            return Ok(());
        };
        position.mark_price = fill_price;
        position.pnl = position.unrealized_pnl(fill_price);

        let round_turn = RoundTurn::from_closed(&position).ok_or_else(|| {
            SimulatorError::InvalidOrderState("closed position is missing lifecycle stamps".into())
        })?;
        self.balance.trade += round_turn.profit;
        self.round_turns.push(round_turn);
        self.closed_positions.push(position);
        Ok(())
    }

    // ─── Mark to market ─────────────────────────────────────────────────

    fn mark_to_market(&mut self, kline: &Kline) {
        let elapsed = self.clock.elapsed();
        let mut unrealized = Decimal::ZERO;
        for position in self.open_positions.values_mut() {
            let funding = self.coster.funding(position, kline.close, elapsed);
            position.cost += funding;
            position.mark_price = kline.close;
            position.pnl = position.unrealized_pnl(kline.close);
            unrealized += position.pnl;
        }
        self.balance.equity = self.balance.trade + unrealized;

        let at = self.clock.now();
        self.equity.insert(at, self.balance.equity);
    }
}
