//! RoundTurn: the realized record of one complete position lifecycle.

use super::ids::PositionId;
use super::order::Side;
use super::position::Position;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Created exactly once when a position closes. The history is
/// append-only; nothing ever edits a round turn after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTurn {
    pub id: PositionId,
    pub created_at: DateTime<Utc>,
    pub asset: String,
    pub side: Side,
    pub profit: Decimal,
    pub hold_secs: i64,
    pub trade_count: u32,
}

impl RoundTurn {
    /// Build from a closed position. Returns `None` while the position is
    /// still live.
    pub fn from_closed(position: &Position) -> Option<Self> {
        let opened_at = position.opened_at?;
        let closed_at = position.closed_at?;
        Some(Self {
            id: position.id,
            created_at: closed_at,
            asset: position.asset.clone(),
            side: position.side,
            profit: position.pnl,
            hold_secs: (closed_at - opened_at).num_seconds(),
            trade_count: position.trade_count,
        })
    }

    pub fn hold_period(&self) -> Duration {
        Duration::seconds(self.hold_secs)
    }

    pub fn is_winner(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}
