//! Request/response DTOs and field validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::numeric::{Price, Quantity, MAX_SCALE};
use types::order::{Order, OrderKind, OrderStatus, Side};

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub client_id: String,
    pub instrument: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub idempotency_key: Option<String>,
}

impl PlaceOrderRequest {
    /// Field validation: quantity positive with scale <= 8, price
    /// present, positive and scale <= 8 iff the order is a limit.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.client_id.trim().is_empty() {
            errors.push("client_id must not be blank".to_string());
        }
        if self.instrument.trim().is_empty() {
            errors.push("instrument must not be blank".to_string());
        }

        if self.quantity <= Decimal::ZERO {
            errors.push("quantity must be positive".to_string());
        } else if self.quantity.normalize().scale() > MAX_SCALE {
            errors.push(format!(
                "quantity precision exceeds {} decimal places",
                MAX_SCALE
            ));
        }

        match (self.kind, self.price) {
            (OrderKind::Limit, None) => {
                errors.push("price is required for limit orders".to_string());
            }
            (OrderKind::Limit, Some(price)) => {
                if price <= Decimal::ZERO {
                    errors.push("price must be positive for limit orders".to_string());
                } else if price.normalize().scale() > MAX_SCALE {
                    errors.push(format!(
                        "price precision exceeds {} decimal places",
                        MAX_SCALE
                    ));
                }
            }
            (OrderKind::Market, Some(_)) => {
                errors.push("price must be omitted for market orders".to_string());
            }
            (OrderKind::Market, None) => {}
        }

        errors
    }

    /// Build the open order record. Call only after `validate`.
    pub fn into_order(self, timestamp: i64) -> Order {
        let price = match self.kind {
            OrderKind::Limit => self.price.and_then(Price::try_new),
            OrderKind::Market => None,
        };
        Order::new(
            self.client_id,
            self.instrument,
            self.side,
            self.kind,
            price,
            Quantity::try_new(self.quantity).unwrap_or_else(Quantity::zero),
            self.idempotency_key
                .filter(|key| !key.trim().is_empty()),
            timestamp,
        )
    }
}

/// Full order record as returned by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub client_id: String,
    pub instrument: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            client_id: order.client_id.clone(),
            instrument: order.instrument.clone(),
            side: order.side,
            kind: order.kind,
            price: order.price,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
