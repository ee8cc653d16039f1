//! The simulator engine.

mod simulator;

pub use simulator::{Simulator, SimulatorConfig, SimulatorError};
