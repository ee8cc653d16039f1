//! Gridlab Runner: concurrent parameter search over the core simulator.
//!
//! This crate builds on `gridlab-core`:
//! - Parameter grids and typed param sets with content-derived ids
//! - Price samples with chronological train/validation splits
//! - Performance metrics (trade and portfolio reports)
//! - Objective ranking
//! - The optimizer: bounded job channel, fixed worker pool, fresh
//!   simulator and strategy per trial, out-of-sample validation of the
//!   winner
//! - CSV export of study results

pub mod export;
pub mod factory;
pub mod metrics;
pub mod optimizer;
pub mod params;
pub mod ranking;
pub mod sample;
pub mod study;

pub use export::{write_study_csv, write_study_csv_path, ExportError};
pub use factory::{SimulatorFactory, StrategyFactory, StrategyRegistry};
pub use metrics::{PerformanceReport, PortfolioReport, TradeReport};
pub use optimizer::{
    CancelToken, OptimizeError, Optimizer, OptimizerConfig, TrialPhase, TrialResult,
};
pub use params::{ParamAxis, ParamGrid, ParamSet, ParamValue};
pub use ranking::Objective;
pub use sample::{PriceSample, SampleSplit};
pub use study::Study;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<PerformanceReport>();
        assert_sync::<PerformanceReport>();
        assert_send::<TradeReport>();
        assert_sync::<TradeReport>();
        assert_send::<PortfolioReport>();
        assert_sync::<PortfolioReport>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<ParamSet>();
        assert_sync::<ParamSet>();
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
        assert_send::<PriceSample>();
        assert_sync::<PriceSample>();
        assert_send::<Study>();
        assert_sync::<Study>();
    }

    #[test]
    fn trial_plumbing_is_send() {
        assert_send::<TrialResult>();
        assert_send::<CancelToken>();
        assert_sync::<CancelToken>();
        assert_send::<OptimizerConfig>();
    }
}
