//! Performance metrics: pure functions over round turns and the equity
//! series.
//!
//! Trade metrics come from the realized round-turn history; portfolio
//! metrics come from the mark-to-market equity series. Everything here is
//! f64 over snapshots of the simulator's decimal state and depends on
//! nothing in the optimizer or the engine.

use gridlab_core::domain::{EquitySeries, RoundTurn};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Metrics over the realized trade history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeReport {
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Pessimistic return ratio: profit factor penalized for low trade
    /// counts.
    pub prr: f64,
    pub kelly: f64,
    pub optimal_f: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_hold_secs: f64,
    pub max_hold_secs: f64,
}

/// Metrics over the mark-to-market equity curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub calmar: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub final_equity: f64,
}

/// Everything the optimizer ranks on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub trade: TradeReport,
    pub portfolio: PortfolioReport,
}

impl PerformanceReport {
    /// Compute all metrics for one finished trial.
    pub fn compute(round_turns: &[RoundTurn], equity: &EquitySeries, initial_capital: f64) -> Self {
        let profits = profits(round_turns);
        let values = equity_values(equity);
        let years = years_spanned(equity);
        let cagr_value = cagr(initial_capital, &values, years);
        let drawdown = max_drawdown(&values);

        Self {
            trade: TradeReport {
                trade_count: round_turns.len(),
                win_rate: win_rate(&profits),
                profit_factor: profit_factor(&profits),
                prr: prr(&profits),
                kelly: kelly(&profits),
                optimal_f: optimal_f(&profits),
                avg_win: avg_win(&profits),
                avg_loss: avg_loss(&profits),
                avg_hold_secs: avg_hold_secs(round_turns),
                max_hold_secs: max_hold_secs(round_turns),
            },
            portfolio: PortfolioReport {
                total_return: total_return(initial_capital, &values),
                cagr: cagr_value,
                sharpe: sharpe(&values, years),
                calmar: calmar(cagr_value, drawdown),
                max_drawdown: drawdown,
                final_equity: values.last().copied().unwrap_or(initial_capital),
            },
        }
    }

    /// Field-wise mean across reports; used to aggregate one param set's
    /// results over several samples. Empty input yields the default
    /// report.
    pub fn average(reports: &[PerformanceReport]) -> PerformanceReport {
        if reports.is_empty() {
            return PerformanceReport::default();
        }
        let n = reports.len() as f64;
        let mean = |extract: fn(&PerformanceReport) -> f64| -> f64 {
            reports.iter().map(extract).sum::<f64>() / n
        };
        let trade_count =
            (reports.iter().map(|r| r.trade.trade_count).sum::<usize>() as f64 / n).round() as usize;

        PerformanceReport {
            trade: TradeReport {
                trade_count,
                win_rate: mean(|r| r.trade.win_rate),
                profit_factor: mean(|r| r.trade.profit_factor),
                prr: mean(|r| r.trade.prr),
                kelly: mean(|r| r.trade.kelly),
                optimal_f: mean(|r| r.trade.optimal_f),
                avg_win: mean(|r| r.trade.avg_win),
                avg_loss: mean(|r| r.trade.avg_loss),
                avg_hold_secs: mean(|r| r.trade.avg_hold_secs),
                max_hold_secs: mean(|r| r.trade.max_hold_secs),
            },
            portfolio: PortfolioReport {
                total_return: mean(|r| r.portfolio.total_return),
                cagr: mean(|r| r.portfolio.cagr),
                sharpe: mean(|r| r.portfolio.sharpe),
                calmar: mean(|r| r.portfolio.calmar),
                max_drawdown: mean(|r| r.portfolio.max_drawdown),
                final_equity: mean(|r| r.portfolio.final_equity),
            },
        }
    }
}

// ─── Trade metrics ──────────────────────────────────────────────────

/// Round-turn profits as f64, in history order.
pub fn profits(round_turns: &[RoundTurn]) -> Vec<f64> {
    round_turns
        .iter()
        .map(|rt| rt.profit.to_f64().unwrap_or(0.0))
        .collect()
}

/// Fraction of trades that were winners.
pub fn win_rate(profits: &[f64]) -> f64 {
    if profits.is_empty() {
        return 0.0;
    }
    let winners = profits.iter().filter(|p| **p > 0.0).count();
    winners as f64 / profits.len() as f64
}

/// Gross profits over gross losses, capped at 100 for the all-winner
/// edge case.
pub fn profit_factor(profits: &[f64]) -> f64 {
    if profits.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = profits.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = profits.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Pessimistic return ratio.
///
/// The profit factor shrunk as if one fewer win and one more loss had
/// happened, in proportion to the square roots of the counts. Few trades
/// drag the ratio down hard; many trades leave it near the raw profit
/// factor.
pub fn prr(profits: &[f64]) -> f64 {
    let wins = profits.iter().filter(|p| **p > 0.0).count();
    if wins == 0 {
        return 0.0;
    }
    let losses = profits.iter().filter(|p| **p < 0.0).count();
    let pf = profit_factor(profits);
    let win_penalty = 1.0 - 1.0 / (wins as f64).sqrt();
    if losses == 0 {
        return pf * win_penalty;
    }
    let loss_penalty = 1.0 + 1.0 / (losses as f64).sqrt();
    pf * win_penalty / loss_penalty
}

/// Kelly fraction from win rate and payoff ratio.
///
/// With no losing trades the payoff ratio grows without bound and the
/// fraction converges to the win rate; with no winners there is nothing
/// to size and the fraction is zero.
pub fn kelly(profits: &[f64]) -> f64 {
    let win_rate = win_rate(profits);
    if win_rate <= 0.0 {
        return 0.0;
    }
    let avg_win = avg_win(profits);
    let avg_loss = avg_loss(profits);
    if avg_loss.abs() < 1e-10 {
        return win_rate;
    }
    let payoff = avg_win / avg_loss.abs();
    if payoff <= 0.0 {
        return 0.0;
    }
    win_rate - (1.0 - win_rate) / payoff
}

/// Optimal f (Vince): the bet fraction maximizing terminal wealth
/// relative over the trade history, searched in steps of 0.01.
pub fn optimal_f(profits: &[f64]) -> f64 {
    let largest_loss = profits.iter().copied().fold(0.0_f64, f64::min);
    if largest_loss >= 0.0 {
        return 0.0;
    }
    let scale = largest_loss.abs();

    let mut best_f = 0.0;
    let mut best_twr = 1.0;
    for step in 1..=100 {
        let f = step as f64 / 100.0;
        let mut twr = 1.0;
        for profit in profits {
            twr *= 1.0 + f * profit / scale;
            if twr <= 0.0 {
                twr = 0.0;
                break;
            }
        }
        if twr > best_twr {
            best_twr = twr;
            best_f = f;
        }
    }
    best_f
}

/// Mean winning trade; zero when there are no winners.
pub fn avg_win(profits: &[f64]) -> f64 {
    let wins: Vec<f64> = profits.iter().copied().filter(|p| *p > 0.0).collect();
    mean_f64(&wins)
}

/// Mean losing trade (negative); zero when there are no losers.
pub fn avg_loss(profits: &[f64]) -> f64 {
    let losses: Vec<f64> = profits.iter().copied().filter(|p| *p < 0.0).collect();
    mean_f64(&losses)
}

/// Mean holding period in seconds.
pub fn avg_hold_secs(round_turns: &[RoundTurn]) -> f64 {
    if round_turns.is_empty() {
        return 0.0;
    }
    round_turns.iter().map(|rt| rt.hold_secs as f64).sum::<f64>() / round_turns.len() as f64
}

/// Longest holding period in seconds.
pub fn max_hold_secs(round_turns: &[RoundTurn]) -> f64 {
    round_turns
        .iter()
        .map(|rt| rt.hold_secs as f64)
        .fold(0.0, f64::max)
}

// ─── Portfolio metrics ──────────────────────────────────────────────

/// Equity amounts in time order, as f64.
pub fn equity_values(equity: &EquitySeries) -> Vec<f64> {
    equity.values().map(|eq| eq.to_f64().unwrap_or(0.0)).collect()
}

/// Calendar years covered by the equity series.
pub fn years_spanned(equity: &EquitySeries) -> f64 {
    let (Some((first, _)), Some((last, _))) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    (last - first).num_seconds() as f64 / (365.25 * 86_400.0)
}

/// Total return as a fraction of initial capital.
pub fn total_return(initial_capital: f64, values: &[f64]) -> f64 {
    let Some(final_equity) = values.last() else {
        return 0.0;
    };
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_capital) / initial_capital
}

/// Compound annual growth rate over the calendar span of the series.
pub fn cagr(initial_capital: f64, values: &[f64], years: f64) -> f64 {
    let Some(final_equity) = values.last() else {
        return 0.0;
    };
    if initial_capital <= 0.0 || *final_equity <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    (final_equity / initial_capital).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from per-bar returns.
///
/// The annualization factor derives from the actual bar spacing: with n
/// returns over y years, one year holds n/y bars.
pub fn sharpe(values: &[f64], years: f64) -> f64 {
    if values.len() < 2 || years <= 0.0 {
        return 0.0;
    }
    let returns: Vec<f64> = values
        .windows(2)
        .map(|pair| {
            if pair[0] > 0.0 {
                (pair[1] - pair[0]) / pair[0]
            } else {
                0.0
            }
        })
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    let periods_per_year = returns.len() as f64 / years;
    (mean / std) * periods_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction; zero for flat or
/// monotonically rising equity.
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;
    for &equity in values {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (equity - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// CAGR over absolute max drawdown; zero without both a positive CAGR
/// and a real drawdown.
pub fn calmar(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown >= 0.0 || cagr <= 0.0 {
        return 0.0;
    }
    cagr / max_drawdown.abs()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gridlab_core::domain::{PositionId, Side};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn make_round_turn(profit: Decimal, hold_secs: i64) -> RoundTurn {
        RoundTurn {
            id: PositionId(1),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            asset: "BTCUSDT".into(),
            side: Side::Buy,
            profit,
            hold_secs,
            trade_count: 2,
        }
    }

    fn make_equity(values: &[f64], secs_apart: i64) -> EquitySeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut series = EquitySeries::new();
        for (i, value) in values.iter().enumerate() {
            let at = base + chrono::Duration::seconds(secs_apart * i as i64);
            series.insert(at, Decimal::from_f64_retain(*value).unwrap_or_default());
        }
        series
    }

    // ── Win rate and profit factor ──

    #[test]
    fn win_rate_mixed() {
        assert!((win_rate(&[500.0, -200.0, 300.0, -100.0]) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn win_rate_empty() {
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn profit_factor_mixed() {
        // Profit 800, loss 200.
        assert!((profit_factor(&[500.0, -200.0, 300.0]) - 4.0).abs() < 1e-10);
    }

    #[test]
    fn profit_factor_all_winners_capped() {
        assert!((profit_factor(&[500.0, 300.0]) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn profit_factor_all_losers() {
        assert_eq!(profit_factor(&[-500.0, -300.0]), 0.0);
    }

    // ── PRR ──

    #[test]
    fn prr_penalizes_low_trade_count() {
        // pf = 4, W = 2, L = 1:
        // 4 * (1 - 1/sqrt(2)) / (1 + 1/sqrt(1)) = 4 * 0.292893 / 2
        let value = prr(&[500.0, -200.0, 300.0]);
        let expected = 4.0 * (1.0 - 1.0 / 2.0_f64.sqrt()) / 2.0;
        assert!((value - expected).abs() < 1e-10);
        assert!(value < profit_factor(&[500.0, -200.0, 300.0]));
    }

    #[test]
    fn prr_no_winners_is_zero() {
        assert_eq!(prr(&[-100.0, -50.0]), 0.0);
    }

    #[test]
    fn prr_single_win_is_fully_penalized() {
        assert_eq!(prr(&[100.0]), 0.0);
    }

    // ── Kelly ──

    #[test]
    fn kelly_known_values() {
        // w = 2/3, payoff = 400/200 = 2: k = 2/3 - (1/3)/2 = 0.5
        let value = kelly(&[500.0, -200.0, 300.0]);
        assert!((value - 0.5).abs() < 1e-10);
    }

    #[test]
    fn kelly_no_losses_converges_to_win_rate() {
        assert!((kelly(&[100.0, 200.0]) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn kelly_no_winners_is_zero() {
        assert_eq!(kelly(&[-100.0]), 0.0);
    }

    // ── Optimal f ──

    #[test]
    fn optimal_f_known_maximum() {
        // TWR(f) = (1 + 3f)(1 - f) peaks at f = 1/3.
        let value = optimal_f(&[300.0, -100.0]);
        assert!((value - 0.33).abs() < 1e-9);
    }

    #[test]
    fn optimal_f_without_losses_is_zero() {
        assert_eq!(optimal_f(&[100.0, 200.0]), 0.0);
    }

    // ── Hold time ──

    #[test]
    fn hold_time_stats() {
        let round_turns = vec![
            make_round_turn(dec!(10), 3_600),
            make_round_turn(dec!(-5), 7_200),
        ];
        assert!((avg_hold_secs(&round_turns) - 5_400.0).abs() < 1e-10);
        assert!((max_hold_secs(&round_turns) - 7_200.0).abs() < 1e-10);
    }

    // ── Portfolio metrics ──

    #[test]
    fn total_return_from_initial_capital() {
        assert!((total_return(1_000.0, &[1_000.0, 1_100.0]) - 0.1).abs() < 1e-10);
        assert_eq!(total_return(1_000.0, &[]), 0.0);
    }

    #[test]
    fn cagr_one_exact_year() {
        // 365.25 days apart: exactly one calendar year.
        let equity = make_equity(&[1_000.0, 1_100.0], (365.25 * 86_400.0) as i64);
        let years = years_spanned(&equity);
        assert!((years - 1.0).abs() < 1e-10);

        let values = equity_values(&equity);
        assert!((cagr(1_000.0, &values, years) - 0.1).abs() < 1e-10);
    }

    #[test]
    fn sharpe_zero_for_constant_equity() {
        let values = vec![1_000.0; 50];
        assert_eq!(sharpe(&values, 1.0), 0.0);
    }

    #[test]
    fn sharpe_positive_for_wobbly_growth() {
        let mut values = vec![1_000.0];
        for i in 1..200 {
            let factor = if i % 2 == 0 { 1.002 } else { 1.0005 };
            values.push(values[i - 1] * factor);
        }
        assert!(sharpe(&values, 1.0) > 0.0);
    }

    #[test]
    fn max_drawdown_known() {
        let values = vec![100_000.0, 110_000.0, 90_000.0, 95_000.0];
        let expected = (90_000.0 - 110_000.0) / 110_000.0;
        assert!((max_drawdown(&values) - expected).abs() < 1e-10);
    }

    #[test]
    fn max_drawdown_monotonic_rise_is_zero() {
        let values: Vec<f64> = (0..100).map(|i| 1_000.0 + i as f64).collect();
        assert_eq!(max_drawdown(&values), 0.0);
    }

    #[test]
    fn calmar_needs_positive_cagr_and_real_drawdown() {
        assert!((calmar(0.2, -0.1) - 2.0).abs() < 1e-10);
        assert_eq!(calmar(-0.1, -0.1), 0.0);
        assert_eq!(calmar(0.2, 0.0), 0.0);
    }

    // ── Aggregates ──

    #[test]
    fn compute_full_report() {
        let round_turns = vec![
            make_round_turn(dec!(50), 3_600),
            make_round_turn(dec!(-20), 7_200),
            make_round_turn(dec!(30), 3_600),
        ];
        let equity = make_equity(&[1_000.0, 1_020.0, 1_010.0, 1_060.0], 86_400);
        let report = PerformanceReport::compute(&round_turns, &equity, 1_000.0);

        assert_eq!(report.trade.trade_count, 3);
        assert!((report.trade.win_rate - 2.0 / 3.0).abs() < 1e-10);
        assert!((report.trade.profit_factor - 4.0).abs() < 1e-10);
        assert!((report.portfolio.total_return - 0.06).abs() < 1e-10);
        assert!(report.portfolio.sharpe.is_finite());
        assert!(report.portfolio.cagr.is_finite());
        assert!(report.portfolio.max_drawdown <= 0.0);
        assert!((report.portfolio.final_equity - 1_060.0).abs() < 1e-10);
    }

    #[test]
    fn compute_with_no_trades_stays_finite() {
        let equity = make_equity(&[1_000.0; 10], 86_400);
        let report = PerformanceReport::compute(&[], &equity, 1_000.0);
        assert_eq!(report.trade.trade_count, 0);
        assert_eq!(report.trade.win_rate, 0.0);
        assert_eq!(report.portfolio.sharpe, 0.0);
        assert!(report.portfolio.total_return.abs() < 1e-10);
    }

    #[test]
    fn average_is_field_wise_mean() {
        let mut a = PerformanceReport::default();
        a.trade.trade_count = 4;
        a.trade.win_rate = 0.5;
        a.portfolio.sharpe = 1.0;

        let mut b = PerformanceReport::default();
        b.trade.trade_count = 6;
        b.trade.win_rate = 0.7;
        b.portfolio.sharpe = 2.0;

        let avg = PerformanceReport::average(&[a, b]);
        assert_eq!(avg.trade.trade_count, 5);
        assert!((avg.trade.win_rate - 0.6).abs() < 1e-10);
        assert!((avg.portfolio.sharpe - 1.5).abs() < 1e-10);
    }

    #[test]
    fn average_of_nothing_is_default() {
        assert_eq!(PerformanceReport::average(&[]), PerformanceReport::default());
    }
}
