//! Factories and the injected strategy registry.
//!
//! Every trial constructs fresh Strategy and Simulator instances through
//! these factories; nothing is pooled or reused across jobs, which is the
//! invariant that keeps concurrent trials independent. The registry
//! replaces any notion of a process-global strategy table: the caller
//! builds one and hands it to whoever wires up an optimizer.

use crate::params::ParamSet;
use gridlab_core::{Simulator, Strategy};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a fresh strategy for one trial from its param set and the
/// number of warmup bars it should sit out before trading.
pub type StrategyFactory = Arc<dyn Fn(&ParamSet, usize) -> Box<dyn Strategy> + Send + Sync>;

/// Builds a fresh simulator for one trial.
pub type SimulatorFactory = Arc<dyn Fn() -> Simulator + Send + Sync>;

/// Explicit name-to-factory mapping, injected at construction time.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: StrategyFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<StrategyFactory> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlab_core::domain::Kline;
    use gridlab_core::SimulatorError;

    struct DoNothing;

    impl Strategy for DoNothing {
        fn on_price(&mut self, _kline: &Kline, _sim: &mut Simulator) -> Result<(), SimulatorError> {
            Ok(())
        }
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = StrategyRegistry::new();
        registry.register(
            "noop",
            Arc::new(|_params: &ParamSet, _warmup: usize| -> Box<dyn Strategy> {
                Box::new(DoNothing)
            }),
        );

        assert!(registry.get("noop").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
