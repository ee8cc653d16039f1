use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier, seeded from the synthetic clock instant at which the
/// order transitioned to `Open`.
///
/// Clock instants are unique within a run, so ids are unique, and because
/// the clock is synthetic they reproduce exactly across reruns of the
/// same bar stream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OrderId(pub i64);

impl OrderId {
    pub fn from_instant(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_micros())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position identifier. A position inherits the id of the order that
/// opened it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PositionId(pub i64);

impl From<OrderId> for PositionId {
    fn from(id: OrderId) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
