//! Order lifecycle types
//!
//! The order is created by intake with status `Open` and mutated
//! exclusively by the matching worker afterwards. Rows are never
//! deleted; terminal states are absorbing.

use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order kind: limit (with price) or market (take best available)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Market,
}

/// Order lifecycle status
///
/// Transitions: `Open -> {PartiallyFilled, Filled, Cancelled}`,
/// `PartiallyFilled -> {Filled, Cancelled}`. `Filled`, `Cancelled`
/// and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Whether an order in this status may rest in a book.
    pub fn is_live(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

/// Complete order record
///
/// For limit orders `price` must be `Some(...)`; market orders carry no
/// price. `filled_quantity` is monotonically non-decreasing and never
/// exceeds `quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_id: String,
    pub instrument: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    pub idempotency_key: Option<String>,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new open order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: impl Into<String>,
        instrument: impl Into<String>,
        side: Side,
        kind: OrderKind,
        price: Option<Price>,
        quantity: Quantity,
        idempotency_key: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            client_id: client_id.into(),
            instrument: instrument.into(),
            side,
            kind,
            price,
            quantity,
            filled_quantity: Quantity::zero(),
            status: OrderStatus::Open,
            idempotency_key,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.kind, OrderKind::Limit)
    }

    pub fn is_market(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }

    /// Unfilled quantity: `quantity - filled_quantity`.
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Record a fill and advance the status
    ///
    /// # Panics
    /// Panics if the fill would exceed the total quantity
    pub fn apply_fill(&mut self, fill_quantity: Quantity, timestamp: i64) {
        let new_filled = self.filled_quantity + fill_quantity;
        assert!(
            new_filled.as_decimal() <= self.quantity.as_decimal(),
            "Fill would exceed order quantity"
        );

        self.filled_quantity = new_filled;
        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::PartiallyFilled;
        }
        self.updated_at = timestamp;
    }

    /// Mark the order cancelled
    ///
    /// # Panics
    /// Panics if the order is already in a terminal state
    pub fn cancel(&mut self, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");
        self.status = OrderStatus::Cancelled;
        self.updated_at = timestamp;
    }

    /// Mark the order rejected (defensive-validation failure)
    pub fn reject(&mut self, timestamp: i64) {
        self.status = OrderStatus::Rejected;
        self.updated_at = timestamp;
    }
}
