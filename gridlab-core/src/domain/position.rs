//! Position entity: the simulator's single open-or-none exposure per asset.

use super::ids::PositionId;
use super::order::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position lifecycle states, derived from timestamp presence like order
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Pending,
    Open,
    Closed,
}

/// An exposure built up and torn down by filled orders.
///
/// `cost` is a signed accumulator of fill notional plus fees and funding.
/// `size` is never negative: it is driven to exactly zero to close the
/// position, and a single order may not push it below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub asset: String,
    pub side: Side,
    pub cost: Decimal,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub mark_price: Decimal,
    pub pnl: Decimal,
    pub trade_count: u32,
}

impl Position {
    /// Current lifecycle state, derived from stamp presence.
    pub fn state(&self) -> PositionState {
        if self.closed_at.is_some() {
            PositionState::Closed
        } else if self.opened_at.is_some() {
            PositionState::Open
        } else {
            PositionState::Pending
        }
    }

    /// Mark-to-market: `size * mark - cost`, negated for short positions
    /// so profitable moves report positive on both sides.
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        let raw = self.size * mark - self.cost;
        match self.side {
            Side::Buy => raw,
            Side::Sell => -raw,
        }
    }
}
