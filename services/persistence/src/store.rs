//! Durable store port
//!
//! The matching core and the intake layer talk to storage only through
//! [`OrderStore`]. Implementations must enforce a unique constraint
//! over non-null idempotency keys and treat re-insertion of an existing
//! trade id as success.

use std::io;
use thiserror::Error;
use types::ids::OrderId;
use types::order::Order;
use types::trade::Trade;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Duplicate idempotency key: {key}")]
    DuplicateIdempotencyKey { key: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ── Port ────────────────────────────────────────────────────────────

/// Durable store for orders and trades.
///
/// Single port used by intake (insert + lookups), the matching worker
/// (batched upserts inside one commit), recovery (live-order scan), and
/// the query surface (recent trades, health ping).
pub trait OrderStore: Send + Sync {
    /// Durably insert a new order.
    ///
    /// Fails with [`StoreError::DuplicateIdempotencyKey`] when the
    /// order carries an idempotency key that is already bound.
    fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Look up the order bound to an idempotency key.
    fn find_by_idempotency(&self, key: &str) -> Result<Option<Order>, StoreError>;

    /// Look up an order by id.
    fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Batched order upsert.
    fn save_orders(&self, orders: &[Order]) -> Result<(), StoreError>;

    /// Batched trade upsert. Re-inserting an existing trade id is a
    /// no-op success.
    fn save_trades(&self, trades: &[Trade]) -> Result<(), StoreError>;

    /// Write one command's trades and order mutations as a unit.
    /// Trades are written before order rows.
    fn commit_execution(&self, trades: &[Trade], orders: &[Order]) -> Result<(), StoreError> {
        self.save_trades(trades)?;
        self.save_orders(orders)
    }

    /// All orders with status open or partially_filled, ascending
    /// created_at. Recovery replays this to rebuild the books.
    fn scan_live_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Most recent trades, newest first.
    fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError>;

    /// Health probe.
    fn ping(&self) -> Result<(), StoreError>;
}
