//! The optimizer: concurrent parameter search over the core simulator.
//!
//! `prepare` expands the grid and splits every sample chronologically;
//! `start` fans the training trials out over a fixed worker pool fed by a
//! bounded job channel, aggregates per-param-set reports across samples,
//! then re-runs the winner on each sample's validation suffix. Selection
//! only ever sees training metrics; validation exists purely to report
//! out-of-sample performance.
//!
//! Every trial owns fresh Strategy and Simulator instances built from the
//! factories carried in its job. That per-job construction is the
//! correctness-critical invariant: a shared simulator would corrupt the
//! order and position histories of concurrent trials. Per-trial failures
//! travel inside `TrialResult` and never abort sibling trials.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{debug, info, warn};

use gridlab_core::domain::{Kline, Order, PositionState};
use gridlab_core::{Simulator, SimulatorError};

use crate::factory::{SimulatorFactory, StrategyFactory};
use crate::metrics::PerformanceReport;
use crate::params::{ParamGrid, ParamSet};
use crate::ranking::Objective;
use crate::sample::{PriceSample, SampleSplit};
use crate::study::Study;

/// Cooperative cancellation flag shared with the worker pool.
///
/// Cancelling stops workers from taking further jobs; a trial already in
/// flight runs to completion. No partial-trial cancellation exists.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Which phase produced a trial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Training,
    Validation,
}

/// Outcome of one (param set, sample) trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub phase: TrialPhase,
    pub param_set: ParamSet,
    pub sample_index: usize,
    pub report: Option<PerformanceReport>,
    pub error: Option<String>,
}

/// Errors from preparing or starting a run.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("parameter grid is empty")]
    EmptyGrid,
    #[error("no price samples supplied")]
    NoSamples,
    #[error("price sample {index} is empty")]
    EmptySample { index: usize },
    #[error("price sample {index} is not strictly ordered by bar start")]
    UnorderedSample { index: usize },
    #[error("sample split pct must lie in [0, 1], got {0}")]
    InvalidSplit(f64),
    #[error("optimizer has not been prepared")]
    NotPrepared,
    #[error("failed to spawn optimizer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Typed optimizer configuration with documented defaults.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Fraction of each sample used for training; the suffix validates
    /// the winner out-of-sample. 0 trains and validates on the identical
    /// full sample; 1 skips validation entirely. Default 0.75.
    pub sample_split_pct: f64,
    /// Bars each strategy sits out before trading. Default 0.
    pub warmup_bars: usize,
    /// Worker pool size. Default: available parallelism.
    pub workers: usize,
    /// Starting balance for every trial simulator. Default 10 000.
    pub initial_capital: Decimal,
    /// Metric that picks the winning param set. Default Sharpe.
    pub objective: Objective,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            sample_split_pct: 0.75,
            warmup_bars: 0,
            workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            initial_capital: dec!(10_000),
            objective: Objective::Sharpe,
        }
    }
}

/// One unit of work for the pool. Carries everything a worker needs to
/// run the trial in isolation.
struct TrialJob {
    phase: TrialPhase,
    param_set: ParamSet,
    sample_index: usize,
    bars: Arc<Vec<Kline>>,
    warmup_bars: usize,
    strategy_factory: StrategyFactory,
    simulator_factory: SimulatorFactory,
    initial_capital: Decimal,
}

struct Prepared {
    param_sets: Vec<ParamSet>,
    splits: Vec<SampleSplit>,
}

pub struct Optimizer {
    config: OptimizerConfig,
    simulator_factory: SimulatorFactory,
    strategy_factory: StrategyFactory,
    prepared: Option<Prepared>,
    study: Arc<Mutex<Study>>,
}

impl Optimizer {
    pub fn new(
        config: OptimizerConfig,
        simulator_factory: SimulatorFactory,
        strategy_factory: StrategyFactory,
    ) -> Self {
        Self {
            config,
            simulator_factory,
            strategy_factory,
            prepared: None,
            study: Arc::new(Mutex::new(Study::default())),
        }
    }

    /// Expand the grid, split the samples, and record the study skeleton.
    /// Returns the number of training trials `start` will run.
    pub fn prepare(
        &mut self,
        grid: &ParamGrid,
        samples: Vec<PriceSample>,
    ) -> Result<usize, OptimizeError> {
        let pct = self.config.sample_split_pct;
        if !(0.0..=1.0).contains(&pct) {
            return Err(OptimizeError::InvalidSplit(pct));
        }
        if grid.is_empty() {
            return Err(OptimizeError::EmptyGrid);
        }
        if samples.is_empty() {
            return Err(OptimizeError::NoSamples);
        }
        for (index, sample) in samples.iter().enumerate() {
            if sample.is_empty() {
                return Err(OptimizeError::EmptySample { index });
            }
            if !sample.is_ordered() {
                return Err(OptimizeError::UnorderedSample { index });
            }
        }

        let param_sets = grid.expand();
        let splits: Vec<SampleSplit> = samples.iter().map(|sample| sample.split(pct)).collect();
        let steps = param_sets.len() * splits.len();

        {
            let mut study = self.study.lock().unwrap_or_else(|poison| poison.into_inner());
            *study = Study::default();
            study.training_param_sets = param_sets.clone();
            study.training_samples = splits.iter().map(|split| split.training.clone()).collect();
            study.validation_samples =
                splits.iter().map(|split| split.validation.clone()).collect();
        }

        debug!(
            param_sets = param_sets.len(),
            samples = splits.len(),
            steps,
            "prepared parameter study"
        );
        self.prepared = Some(Prepared { param_sets, splits });
        Ok(steps)
    }

    /// Run the search. Returns the channel carrying every training and
    /// validation `TrialResult`; it closes once all trials are done.
    /// Call `study` afterwards for the aggregate. A new `prepare` is
    /// required before the next `start`.
    pub fn start(&mut self, cancel: CancelToken) -> Result<Receiver<TrialResult>, OptimizeError> {
        let prepared = self.prepared.take().ok_or(OptimizeError::NotPrepared)?;
        let (result_tx, result_rx) = mpsc::channel();

        let config = self.config.clone();
        let study = Arc::clone(&self.study);
        let simulator_factory = Arc::clone(&self.simulator_factory);
        let strategy_factory = Arc::clone(&self.strategy_factory);

        thread::Builder::new()
            .name("gridlab-optimizer".into())
            .spawn(move || {
                orchestrate(
                    prepared,
                    config,
                    study,
                    simulator_factory,
                    strategy_factory,
                    cancel,
                    result_tx,
                );
            })?;

        Ok(result_rx)
    }

    /// Snapshot of the accumulated study. Complete once the result
    /// channel has closed.
    pub fn study(&self) -> Study {
        self.study
            .lock()
            .map(|study| study.clone())
            .unwrap_or_default()
    }
}

// ─── Orchestration ──────────────────────────────────────────────────

fn orchestrate(
    prepared: Prepared,
    config: OptimizerConfig,
    study: Arc<Mutex<Study>>,
    simulator_factory: SimulatorFactory,
    strategy_factory: StrategyFactory,
    cancel: CancelToken,
    result_tx: Sender<TrialResult>,
) {
    // Training phase: every (param set, sample) pair. Bars are shared per
    // split; the jobs clone only the Arc.
    let training_bars: Vec<Arc<Vec<Kline>>> = prepared
        .splits
        .iter()
        .map(|split| Arc::new(split.training.bars().to_vec()))
        .collect();

    let mut jobs = Vec::with_capacity(prepared.param_sets.len() * prepared.splits.len());
    for param_set in &prepared.param_sets {
        for (sample_index, bars) in training_bars.iter().enumerate() {
            jobs.push(TrialJob {
                phase: TrialPhase::Training,
                param_set: param_set.clone(),
                sample_index,
                bars: Arc::clone(bars),
                warmup_bars: config.warmup_bars,
                strategy_factory: Arc::clone(&strategy_factory),
                simulator_factory: Arc::clone(&simulator_factory),
                initial_capital: config.initial_capital,
            });
        }
    }

    info!(
        jobs = jobs.len(),
        workers = config.workers,
        "starting training sweep"
    );
    let training = run_pool(jobs, config.workers, &cancel, &result_tx);

    // Aggregate per param set: averaged across samples, successes only.
    // Results arrive in completion order; grouping keys on sample index so
    // the average sums in a fixed order regardless of worker scheduling.
    let mut grouped: BTreeMap<String, Vec<(usize, PerformanceReport)>> = BTreeMap::new();
    for result in &training {
        match (&result.report, &result.error) {
            (Some(report), _) => {
                grouped
                    .entry(result.param_set.id.clone())
                    .or_default()
                    .push((result.sample_index, report.clone()));
            }
            (None, Some(error)) => {
                warn!(
                    param_set = %result.param_set.id,
                    sample = result.sample_index,
                    %error,
                    "training trial failed"
                );
            }
            (None, None) => {}
        }
    }
    let averaged: BTreeMap<String, PerformanceReport> = grouped
        .into_iter()
        .map(|(id, mut reports)| {
            reports.sort_by_key(|(sample_index, _)| *sample_index);
            let ordered: Vec<PerformanceReport> =
                reports.into_iter().map(|(_, report)| report).collect();
            (id, PerformanceReport::average(&ordered))
        })
        .collect();

    if let Ok(mut study) = study.lock() {
        study.training_results = averaged.clone();
    }

    if cancel.is_cancelled() {
        debug!("cancelled before validation phase");
        return;
    }

    // Winner selection sees training metrics only.
    let winner = prepared
        .param_sets
        .iter()
        .filter_map(|set| {
            averaged
                .get(&set.id)
                .map(|report| (set, config.objective.extract(report)))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(set, _)| set.clone());

    let Some(winner) = winner else {
        debug!("no training results; skipping validation");
        return;
    };
    info!(param_set = %winner.id, "training winner selected");

    // Validation phase: the winner alone, on each out-of-sample suffix.
    let jobs: Vec<TrialJob> = prepared
        .splits
        .iter()
        .enumerate()
        .filter(|(_, split)| !split.validation.is_empty())
        .map(|(sample_index, split)| TrialJob {
            phase: TrialPhase::Validation,
            param_set: winner.clone(),
            sample_index,
            bars: Arc::new(split.validation.bars().to_vec()),
            warmup_bars: config.warmup_bars,
            strategy_factory: Arc::clone(&strategy_factory),
            simulator_factory: Arc::clone(&simulator_factory),
            initial_capital: config.initial_capital,
        })
        .collect();

    let mut validation = run_pool(jobs, config.workers, &cancel, &result_tx);
    validation.sort_by_key(|result| result.sample_index);

    let reports: Vec<PerformanceReport> = validation
        .iter()
        .filter_map(|result| result.report.clone())
        .collect();
    if let Ok(mut study) = study.lock() {
        study.validation_param_sets = vec![winner.clone()];
        if !reports.is_empty() {
            study
                .validation_results
                .insert(winner.id.clone(), PerformanceReport::average(&reports));
        }
    }
    // result_tx drops here; the caller's channel closes.
}

/// Drain `jobs` through a fixed pool of workers.
///
/// Jobs ride a channel bounded to the full job count and fully enqueued
/// before the workers start, so there is no producer backpressure. Each
/// finished trial is forwarded to the caller's result channel and kept
/// for aggregation. Workers stop pulling once the token cancels.
fn run_pool(
    jobs: Vec<TrialJob>,
    workers: usize,
    cancel: &CancelToken,
    result_tx: &Sender<TrialResult>,
) -> Vec<TrialResult> {
    if jobs.is_empty() {
        return Vec::new();
    }
    let worker_count = workers.max(1).min(jobs.len());

    let (job_tx, job_rx) = mpsc::sync_channel::<TrialJob>(jobs.len());
    for job in jobs {
        // Capacity equals the job count, so this never blocks.
        let _ = job_tx.send(job);
    }
    drop(job_tx);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let (done_tx, done_rx) = mpsc::channel::<TrialResult>();

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let job = {
                    let Ok(receiver) = job_rx.lock() else { break };
                    receiver.recv()
                };
                let Ok(job) = job else { break };
                let result = run_trial(job);
                if done_tx.send(result).is_err() {
                    break;
                }
            });
        }
        drop(done_tx);

        let mut collected = Vec::new();
        while let Ok(result) = done_rx.recv() {
            // Blocking on a stalled consumer is the accepted degenerate
            // case; the send result is ignored if the caller hung up.
            let _ = result_tx.send(result.clone());
            collected.push(result);
        }
        collected
    })
}

/// Run one trial: fresh simulator and strategy, serial bar replay, open
/// positions flattened at sample end, report computed from the realized
/// history.
fn run_trial(job: TrialJob) -> TrialResult {
    let mut sim = (job.simulator_factory)();
    sim.set_initial_capital(job.initial_capital);
    let mut strategy = (job.strategy_factory)(&job.param_set, job.warmup_bars);

    let bars = Arc::clone(&job.bars);
    for kline in bars.iter() {
        if let Err(error) = sim.next(kline) {
            return trial_error(job, error);
        }
        if let Err(error) = strategy.on_price(kline, &mut sim) {
            return trial_error(job, error);
        }
    }

    sim.cancel_orders();
    if let Err(error) = close_open_positions(&mut sim) {
        return trial_error(job, error);
    }

    let initial = job.initial_capital.to_f64().unwrap_or(0.0);
    let report = PerformanceReport::compute(&sim.round_turns(), &sim.equity_history(), initial);
    TrialResult {
        phase: job.phase,
        param_set: job.param_set,
        sample_index: job.sample_index,
        report: Some(report),
        error: None,
    }
}

/// Flatten any open exposure with reduce-only market orders at the last
/// bar's close.
fn close_open_positions(sim: &mut Simulator) -> Result<(), SimulatorError> {
    let open: Vec<_> = sim
        .positions()
        .into_iter()
        .filter(|position| position.state() == PositionState::Open)
        .collect();
    for position in open {
        let order = Order::market(
            position.asset.clone(),
            position.side.opposite(),
            position.size,
        )
        .reduce_only();
        sim.add_order(order)?;
    }
    Ok(())
}

fn trial_error(job: TrialJob, error: SimulatorError) -> TrialResult {
    TrialResult {
        phase: job.phase,
        param_set: job.param_set,
        sample_index: job.sample_index,
        report: None,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use gridlab_core::{NullCoster, Strategy};

    struct DoNothing;

    impl Strategy for DoNothing {
        fn on_price(&mut self, _kline: &Kline, _sim: &mut Simulator) -> Result<(), SimulatorError> {
            Ok(())
        }
    }

    fn noop_optimizer(config: OptimizerConfig) -> Optimizer {
        Optimizer::new(
            config,
            Arc::new(|| Simulator::new(Box::new(NullCoster))),
            Arc::new(|_params: &ParamSet, _warmup: usize| -> Box<dyn Strategy> {
                Box::new(DoNothing)
            }),
        )
    }

    fn one_axis_grid() -> ParamGrid {
        ParamGrid::new().axis("threshold", vec![ParamValue::Int(1), ParamValue::Int(2)])
    }

    #[test]
    fn cancel_token_toggles() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn config_defaults_are_sane() {
        let config = OptimizerConfig::default();
        assert!((config.sample_split_pct - 0.75).abs() < 1e-10);
        assert!(config.workers >= 1);
        assert_eq!(config.objective, Objective::Sharpe);
    }

    #[test]
    fn prepare_rejects_empty_grid() {
        let mut optimizer = noop_optimizer(OptimizerConfig::default());
        let result = optimizer.prepare(&ParamGrid::new(), vec![PriceSample::new(vec![])]);
        assert!(matches!(result, Err(OptimizeError::EmptyGrid)));
    }

    #[test]
    fn prepare_rejects_missing_and_empty_samples() {
        let mut optimizer = noop_optimizer(OptimizerConfig::default());
        assert!(matches!(
            optimizer.prepare(&one_axis_grid(), vec![]),
            Err(OptimizeError::NoSamples)
        ));
        assert!(matches!(
            optimizer.prepare(&one_axis_grid(), vec![PriceSample::new(vec![])]),
            Err(OptimizeError::EmptySample { index: 0 })
        ));
    }

    #[test]
    fn prepare_rejects_bad_split() {
        let mut config = OptimizerConfig::default();
        config.sample_split_pct = 1.5;
        let mut optimizer = noop_optimizer(config);
        assert!(matches!(
            optimizer.prepare(&one_axis_grid(), vec![]),
            Err(OptimizeError::InvalidSplit(_))
        ));
    }

    #[test]
    fn start_without_prepare_fails() {
        let mut optimizer = noop_optimizer(OptimizerConfig::default());
        assert!(matches!(
            optimizer.start(CancelToken::new()),
            Err(OptimizeError::NotPrepared)
        ));
    }
}
