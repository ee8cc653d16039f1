//! Account balance and the per-bar equity series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Realized cash and mark-to-market equity.
///
/// `trade` moves only when a position closes (realized P&L lands) or when
/// the initial capital is set; `equity` is recomputed on every price bar
/// as realized balance plus unrealized P&L.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub trade: Decimal,
    pub equity: Decimal,
}

/// Equity over synthetic time.
///
/// One entry per processed bar, keyed by the clock instant at which the
/// bar was marked. Keys are unique because the clock never returns the
/// same instant twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquitySeries(BTreeMap<DateTime<Utc>, Decimal>);

impl EquitySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, at: DateTime<Utc>, equity: Decimal) {
        self.0.insert(at, equity);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<(DateTime<Utc>, Decimal)> {
        self.0.iter().next().map(|(at, eq)| (*at, *eq))
    }

    pub fn last(&self) -> Option<(DateTime<Utc>, Decimal)> {
        self.0.iter().next_back().map(|(at, eq)| (*at, *eq))
    }

    /// Entries in time order.
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Decimal)> {
        self.0.iter()
    }

    /// Equity amounts in time order.
    pub fn values(&self) -> impl Iterator<Item = &Decimal> {
        self.0.values()
    }
}
