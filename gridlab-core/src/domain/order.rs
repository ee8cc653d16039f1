//! Order entity and its derived lifecycle state.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which way an order trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// How an order prices its fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill at the current bar's close.
    Market,
    /// Fill at the limit price once a later bar trades through it.
    Limit,
}

/// Order lifecycle states.
///
/// Never stored: always derived from which timestamps are present, so an
/// order cannot claim an impossible combination (a fill without an open,
/// say). Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Open,
    Filled,
    Closed,
}

/// A single order.
///
/// Side and type are optional at construction and validated on
/// submission; the lifecycle stamps are set in sequence by the simulator
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub opened_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub asset: String,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub limit_price: Decimal,
    pub size: Decimal,
    pub reduce_only: bool,
    pub filled_price: Decimal,
    pub filled_size: Decimal,
    pub fee: Decimal,
}

impl Order {
    fn blank(asset: String) -> Self {
        Self {
            id: OrderId::default(),
            opened_at: None,
            filled_at: None,
            closed_at: None,
            asset,
            side: None,
            order_type: None,
            limit_price: Decimal::ZERO,
            size: Decimal::ZERO,
            reduce_only: false,
            filled_price: Decimal::ZERO,
            filled_size: Decimal::ZERO,
            fee: Decimal::ZERO,
        }
    }

    /// New market order in `Pending` state.
    pub fn market(asset: impl Into<String>, side: Side, size: Decimal) -> Self {
        let mut order = Self::blank(asset.into());
        order.side = Some(side);
        order.order_type = Some(OrderType::Market);
        order.size = size;
        order
    }

    /// New limit order in `Pending` state.
    pub fn limit(asset: impl Into<String>, side: Side, limit_price: Decimal, size: Decimal) -> Self {
        let mut order = Self::blank(asset.into());
        order.side = Some(side);
        order.order_type = Some(OrderType::Limit);
        order.limit_price = limit_price;
        order.size = size;
        order
    }

    /// Mark the order reduce-only: it may shrink or close an existing
    /// position but never open or flip one.
    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    /// Current lifecycle state, derived from stamp presence.
    pub fn state(&self) -> OrderState {
        if self.closed_at.is_some() {
            OrderState::Closed
        } else if self.filled_at.is_some() {
            OrderState::Filled
        } else if self.opened_at.is_some() {
            OrderState::Open
        } else {
            OrderState::Pending
        }
    }
}
