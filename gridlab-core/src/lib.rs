//! Gridlab Core: the deterministic bar-replay simulator.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (klines, orders, positions, round turns, balances)
//! - A synthetic clock that manufactures strictly increasing intra-bar
//!   instants, so backtests replay identically every run
//! - Pluggable execution cost models (slippage, spread, fees, funding)
//! - The `Simulator` order/position state machine
//! - The `Strategy` boundary trait

pub mod clock;
pub mod cost;
pub mod domain;
pub mod engine;
pub mod strategy;

pub use clock::Clock;
pub use cost::{Coster, NullCoster, PerpCoster};
pub use engine::{Simulator, SimulatorConfig, SimulatorError};
pub use strategy::Strategy;
