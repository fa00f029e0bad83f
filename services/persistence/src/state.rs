//! In-memory index over orders and trades
//!
//! Shared by [`crate::memory::MemoryStore`] (as its whole state) and
//! [`crate::file::FileStore`] (as the index rebuilt from the log).

use std::collections::{HashMap, HashSet};
use types::ids::{OrderId, TradeId};
use types::order::Order;
use types::trade::Trade;

/// Orders by id, idempotency index, and trades in arrival order.
#[derive(Debug, Default)]
pub struct StoreState {
    orders: HashMap<OrderId, Order>,
    idempotency: HashMap<String, OrderId>,
    trades: Vec<Trade>,
    trade_ids: HashSet<TradeId>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key is already bound to some order.
    pub fn idempotency_bound(&self, key: &str) -> bool {
        self.idempotency.contains_key(key)
    }

    /// Upsert an order, indexing its idempotency key on first sight.
    pub fn apply_order(&mut self, order: &Order) {
        if let Some(key) = &order.idempotency_key {
            self.idempotency
                .entry(key.clone())
                .or_insert(order.order_id);
        }
        self.orders.insert(order.order_id, order.clone());
    }

    /// Insert a trade unless its id was already seen.
    pub fn apply_trade(&mut self, trade: &Trade) {
        if self.trade_ids.insert(trade.trade_id) {
            self.trades.push(trade.clone());
        }
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn order_by_idempotency(&self, key: &str) -> Option<&Order> {
        self.idempotency.get(key).and_then(|id| self.orders.get(id))
    }

    /// Live orders (open / partially_filled), ascending created_at.
    /// Ties break on order id, which is itself time-ordered.
    pub fn live_orders(&self) -> Vec<Order> {
        let mut live: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.status.is_live())
            .cloned()
            .collect();
        live.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.as_uuid().cmp(b.order_id.as_uuid()))
        });
        live
    }

    /// Newest trades first, up to `limit`.
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        let mut recent: Vec<Trade> = self.trades.clone();
        recent.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        recent.truncate(limit);
        recent
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}
