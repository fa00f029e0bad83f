//! In-memory store implementation
//!
//! Reference implementation of the port; used by tests and available
//! for ephemeral deployments.

use crate::state::StoreState;
use crate::store::{OrderStore, StoreError};
use std::sync::{Mutex, MutexGuard};
use types::ids::OrderId;
use types::order::Order;
use types::trade::Trade;

/// Mutex-guarded [`StoreState`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

impl OrderStore for MemoryStore {
    fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(key) = &order.idempotency_key {
            if state.idempotency_bound(key) {
                return Err(StoreError::DuplicateIdempotencyKey { key: key.clone() });
            }
        }
        state.apply_order(order);
        Ok(())
    }

    fn find_by_idempotency(&self, key: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.order_by_idempotency(key).cloned())
    }

    fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.order(order_id).cloned())
    }

    fn save_orders(&self, orders: &[Order]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        for order in orders {
            state.apply_order(order);
        }
        Ok(())
    }

    fn save_trades(&self, trades: &[Trade]) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        for trade in trades {
            state.apply_trade(trade);
        }
        Ok(())
    }

    fn scan_live_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.lock()?.live_orders())
    }

    fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError> {
        Ok(self.lock()?.recent_trades(limit))
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
