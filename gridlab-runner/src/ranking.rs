//! Objective: the configurable metric that ranks param sets.

use crate::metrics::PerformanceReport;
use serde::{Deserialize, Serialize};

/// Which metric the optimizer maximizes when picking the winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    Sharpe,
    Prr,
    ProfitFactor,
    Cagr,
    Calmar,
    MaxDrawdown,
}

impl Objective {
    /// Pull the relevant metric out of a report.
    pub fn extract(&self, report: &PerformanceReport) -> f64 {
        match self {
            Self::Sharpe => report.portfolio.sharpe,
            Self::Prr => report.trade.prr,
            Self::ProfitFactor => report.trade.profit_factor,
            Self::Cagr => report.portfolio.cagr,
            Self::Calmar => report.portfolio.calmar,
            Self::MaxDrawdown => report.portfolio.max_drawdown,
        }
    }

    /// Whether `a` beats `b`. Higher wins for every objective; max
    /// drawdown is stored as a negative fraction, so "less negative"
    /// wins under the same comparison.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PerformanceReport {
        let mut report = PerformanceReport::default();
        report.portfolio.sharpe = 1.5;
        report.portfolio.cagr = 0.12;
        report.portfolio.calmar = 1.2;
        report.portfolio.max_drawdown = -0.10;
        report.trade.prr = 0.8;
        report.trade.profit_factor = 1.8;
        report
    }

    #[test]
    fn extract_pulls_the_right_field() {
        let report = sample_report();
        assert!((Objective::Sharpe.extract(&report) - 1.5).abs() < 1e-10);
        assert!((Objective::Prr.extract(&report) - 0.8).abs() < 1e-10);
        assert!((Objective::MaxDrawdown.extract(&report) - (-0.10)).abs() < 1e-10);
    }

    #[test]
    fn default_is_sharpe() {
        assert_eq!(Objective::default(), Objective::Sharpe);
    }

    #[test]
    fn drawdown_comparison_prefers_less_negative() {
        assert!(Objective::MaxDrawdown.is_better(-0.05, -0.20));
        assert!(!Objective::MaxDrawdown.is_better(-0.20, -0.05));
    }
}
