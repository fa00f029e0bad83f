//! Trade execution types
//!
//! A trade is an atomic exchange between a buy order and a sell order,
//! priced at the resting order's price at the moment of match.

use crate::ids::{OrderId, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};

/// Executed trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub instrument: String,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Create a new trade with a fresh id
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        instrument: impl Into<String>,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            buy_order_id,
            sell_order_id,
            instrument: instrument.into(),
            price,
            quantity,
            executed_at,
        }
    }

    /// Build a trade from an aggressor and a resting order id.
    ///
    /// Buy/sell assignment follows the aggressor's side; the price is
    /// the resting order's level price.
    pub fn between(
        aggressor_id: OrderId,
        aggressor_side: Side,
        resting_id: OrderId,
        instrument: impl Into<String>,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        let (buy_order_id, sell_order_id) = match aggressor_side {
            Side::Buy => (aggressor_id, resting_id),
            Side::Sell => (resting_id, aggressor_id),
        };
        Self::new(
            buy_order_id,
            sell_order_id,
            instrument,
            price,
            quantity,
            executed_at,
        )
    }

    /// Calculate trade value (price x quantity)
    pub fn trade_value(&self) -> rust_decimal::Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}
