//! Kline: one OHLCV candlestick over a fixed time interval.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV price bar for a single asset.
///
/// Bars are strictly ordered by `start`; the simulator assumes each call
/// to `next` carries a later bar than the one before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub start: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: f64,
}

impl Kline {
    /// Basic OHLC sanity check: high bounds open/close from above, low
    /// from below, and prices are positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
    }

    /// Whether `price` lies within the bar's traded range, both bounds
    /// inclusive.
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.low && price <= self.high
    }
}
