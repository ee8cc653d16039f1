//! The strategy boundary.
//!
//! A strategy is anything that receives each price bar and may place
//! orders in response. The simulator has no compile-time dependency on
//! strategy internals; it only ever sees the orders a strategy submits,
//! and a strategy only ever sees the simulator's public API.

use crate::domain::Kline;
use crate::engine::{Simulator, SimulatorError};

/// A price-receiver that drives one simulator.
///
/// `Send` because the optimizer constructs strategies inside worker
/// threads. Each strategy instance owns exactly one trial; nothing is
/// shared between concurrent trials.
pub trait Strategy: Send {
    /// Called once per price bar, after the simulator has processed the
    /// bar. The strategy may inspect simulator state and place orders.
    fn on_price(&mut self, kline: &Kline, sim: &mut Simulator) -> Result<(), SimulatorError>;
}
