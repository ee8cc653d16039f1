//! Execution cost models: slippage, spread, transaction fees, funding.
//!
//! Slippage and spread are returned as absolute amounts; the simulator
//! applies them directionally, worsening the fill on both sides. Funding
//! accrues in discrete hourly steps: fractional hours charge nothing, and
//! repeated calls within the same hour charge zero.

use crate::domain::{Order, Position};
use chrono::Duration;
use rust_decimal::Decimal;

/// Execution friction model consumed by the simulator.
pub trait Coster: Send {
    /// Price impact of crossing the book, as an absolute amount.
    fn slippage(&self, price: Decimal) -> Decimal;

    /// Half-spread cost, applied on top of the slippage-adjusted price.
    fn spread(&self, price: Decimal) -> Decimal;

    /// Fee for a fill; reads the order's filled price and size.
    fn transaction(&self, order: &Order) -> Decimal;

    /// Carrying cost for holding `position`, given the total duration
    /// since the simulation started. Stateful: implementations track the
    /// latest whole hour they have already charged.
    fn funding(&mut self, position: &Position, price: Decimal, elapsed: Duration) -> Decimal;
}

/// Perpetual-futures style cost model.
///
/// Slippage and spread are percentages of price, the fee is a percentage
/// of fill notional, and funding is an hourly rate on position notional.
#[derive(Debug, Clone)]
pub struct PerpCoster {
    slippage_pct: Decimal,
    spread_pct: Decimal,
    fee_pct: Decimal,
    funding_hourly_pct: Decimal,
    funded_hours: i64,
}

impl PerpCoster {
    /// Rates are fractions: `dec!(0.01)` is 1%.
    pub fn new(
        slippage_pct: Decimal,
        spread_pct: Decimal,
        fee_pct: Decimal,
        funding_hourly_pct: Decimal,
    ) -> Self {
        Self {
            slippage_pct,
            spread_pct,
            fee_pct,
            funding_hourly_pct,
            funded_hours: 0,
        }
    }
}

impl Coster for PerpCoster {
    fn slippage(&self, price: Decimal) -> Decimal {
        price * self.slippage_pct
    }

    fn spread(&self, price: Decimal) -> Decimal {
        price * self.spread_pct
    }

    fn transaction(&self, order: &Order) -> Decimal {
        order.filled_price * order.filled_size * self.fee_pct
    }

    fn funding(&mut self, position: &Position, price: Decimal, elapsed: Duration) -> Decimal {
        let hours = elapsed.num_hours();
        if hours <= self.funded_hours {
            return Decimal::ZERO;
        }
        let unfunded = hours - self.funded_hours;
        self.funded_hours = hours;
        price * position.size * self.funding_hourly_pct * Decimal::from(unfunded)
    }
}

/// Cost model that charges nothing; isolates raw strategy P&L.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCoster;

impl Coster for NullCoster {
    fn slippage(&self, _price: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn spread(&self, _price: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn transaction(&self, _order: &Order) -> Decimal {
        Decimal::ZERO
    }

    fn funding(&mut self, _position: &Position, _price: Decimal, _elapsed: Duration) -> Decimal {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionId, Side};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn perp() -> PerpCoster {
        PerpCoster::new(dec!(0.01), dec!(0.02), dec!(0.10), dec!(0.001))
    }

    fn open_position(size: Decimal) -> Position {
        Position {
            id: PositionId(1),
            opened_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            closed_at: None,
            asset: "BTCUSDT".into(),
            side: Side::Buy,
            cost: Decimal::ZERO,
            size,
            entry_price: Decimal::ZERO,
            exit_price: Decimal::ZERO,
            mark_price: Decimal::ZERO,
            pnl: Decimal::ZERO,
            trade_count: 1,
        }
    }

    #[test]
    fn slippage_and_spread_are_price_fractions() {
        let coster = perp();
        assert_eq!(coster.slippage(dec!(10)), dec!(0.1));
        assert_eq!(coster.spread(dec!(10.1)), dec!(0.202));
    }

    #[test]
    fn transaction_fee_is_notional_fraction() {
        let coster = perp();
        let mut order = Order::market("BTCUSDT", Side::Buy, dec!(2));
        order.filled_price = dec!(10.302);
        order.filled_size = dec!(2);
        assert_eq!(coster.transaction(&order), dec!(2.0604));
    }

    #[test]
    fn funding_charges_only_whole_hours() {
        let mut coster = perp();
        let position = open_position(dec!(2));

        // 59 minutes: no whole hour has elapsed yet.
        assert_eq!(
            coster.funding(&position, dec!(12), Duration::minutes(59)),
            Decimal::ZERO
        );

        // First whole hour charges once.
        assert_eq!(
            coster.funding(&position, dec!(12), Duration::hours(1)),
            dec!(0.024)
        );

        // Same hour again: already funded.
        assert_eq!(
            coster.funding(&position, dec!(12), Duration::minutes(90)),
            Decimal::ZERO
        );

        // Jumping to hour three charges the two missing hours.
        assert_eq!(
            coster.funding(&position, dec!(10), Duration::hours(3)),
            dec!(0.04)
        );
    }

    #[test]
    fn null_coster_charges_nothing() {
        let mut coster = NullCoster;
        let position = open_position(dec!(5));
        let mut order = Order::market("BTCUSDT", Side::Sell, dec!(5));
        order.filled_price = dec!(100);
        order.filled_size = dec!(5);

        assert_eq!(coster.slippage(dec!(100)), Decimal::ZERO);
        assert_eq!(coster.spread(dec!(100)), Decimal::ZERO);
        assert_eq!(coster.transaction(&order), Decimal::ZERO);
        assert_eq!(
            coster.funding(&position, dec!(100), Duration::hours(10)),
            Decimal::ZERO
        );
    }
}
