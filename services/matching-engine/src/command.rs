//! Engine commands
//!
//! The tagged union carried by the bounded queue. Each variant has a
//! dedicated handler in the worker.

use types::ids::OrderId;
use types::order::Order;

/// A unit of work for the matching worker.
#[derive(Debug, Clone)]
pub enum Command {
    /// Match an order that intake already persisted as open.
    Place(Box<Order>),
    /// Remove a resting order from its book.
    Cancel(OrderId),
}
