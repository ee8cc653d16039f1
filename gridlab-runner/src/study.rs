//! Study: the accumulated outcome of one optimizer run.

use crate::metrics::PerformanceReport;
use crate::params::ParamSet;
use crate::ranking::Objective;
use crate::sample::PriceSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Built incrementally by the optimizer, cloned out as a read-only
/// snapshot for everyone else.
///
/// Training results are averaged per param set across all samples;
/// validation results exist only for the winning param set and only over
/// the out-of-sample suffixes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    pub training_param_sets: Vec<ParamSet>,
    pub training_samples: Vec<PriceSample>,
    pub training_results: BTreeMap<String, PerformanceReport>,
    pub validation_param_sets: Vec<ParamSet>,
    pub validation_samples: Vec<PriceSample>,
    pub validation_results: BTreeMap<String, PerformanceReport>,
}

impl Study {
    /// Training results ranked best-first under `objective`.
    pub fn ranked_training(&self, objective: Objective) -> Vec<(&ParamSet, &PerformanceReport)> {
        let mut rows: Vec<(&ParamSet, &PerformanceReport)> = self
            .training_param_sets
            .iter()
            .filter_map(|set| self.training_results.get(&set.id).map(|report| (set, report)))
            .collect();
        rows.sort_by(|a, b| {
            objective
                .extract(b.1)
                .partial_cmp(&objective.extract(a.1))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// The winning param set, if training produced any results.
    pub fn best_training(&self, objective: Objective) -> Option<(&ParamSet, &PerformanceReport)> {
        self.ranked_training(objective).into_iter().next()
    }
}
