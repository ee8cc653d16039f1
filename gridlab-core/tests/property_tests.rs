//! Property tests over arbitrary order streams.

use chrono::{TimeZone, Utc};
use gridlab_core::domain::{Kline, Order, PositionState, Side};
use gridlab_core::{NullCoster, Simulator};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn bars(count: usize) -> Vec<Kline> {
    (0..count)
        .map(|i| {
            // Deterministic wobble so fills happen at varied prices.
            let close = Decimal::from(100 + (i as i64 * 7) % 23);
            Kline {
                start: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: close,
                high: close + dec!(3),
                low: close - dec!(3),
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

proptest! {
    /// Whatever stream of market orders arrives, position size never goes
    /// negative, at most one position per asset is open, and realized
    /// round-turn profits reconcile exactly with the trade balance.
    #[test]
    fn order_streams_preserve_core_invariants(
        ops in proptest::collection::vec((any::<bool>(), 1i64..5, any::<bool>()), 1..40)
    ) {
        let mut sim = Simulator::new(Box::new(NullCoster));
        sim.set_initial_capital(dec!(10_000));

        let bars = bars(ops.len() + 1);
        let _ = sim.next(&bars[0]);

        for (i, (is_buy, size, reduce)) in ops.iter().enumerate() {
            let side = if *is_buy { Side::Buy } else { Side::Sell };
            let mut order = Order::market("BTCUSDT", side, Decimal::from(*size));
            if *reduce {
                order = order.reduce_only();
            }
            // Rejections are expected for some streams; their economic
            // effect must simply be void.
            let _ = sim.add_order(order);
            let _ = sim.next(&bars[i + 1]);

            for position in sim.positions() {
                prop_assert!(position.size >= Decimal::ZERO);
            }
            let open_count = sim
                .positions()
                .iter()
                .filter(|p| p.state() == PositionState::Open)
                .count();
            prop_assert!(open_count <= 1);
        }

        let realized: Decimal = sim.round_turns().iter().map(|rt| rt.profit).sum();
        prop_assert_eq!(sim.balance().trade, dec!(10_000) + realized);
    }

    /// The equity series always carries exactly one entry per processed
    /// bar, in strictly increasing time order.
    #[test]
    fn equity_series_has_one_unique_key_per_bar(bar_count in 1usize..60) {
        let mut sim = Simulator::new(Box::new(NullCoster));
        sim.set_initial_capital(dec!(1000));

        for kline in bars(bar_count) {
            let _ = sim.next(&kline);
        }
        prop_assert_eq!(sim.equity_history().len(), bar_count);
    }
}
