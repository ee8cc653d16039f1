//! Domain types shared by the simulator and its consumers.

pub mod balance;
pub mod ids;
pub mod kline;
pub mod order;
pub mod position;
pub mod round_turn;

pub use balance::{AccountBalance, EquitySeries};
pub use ids::{OrderId, PositionId};
pub use kline::Kline;
pub use order::{Order, OrderState, OrderType, Side};
pub use position::{Position, PositionState};
pub use round_turn::RoundTurn;
