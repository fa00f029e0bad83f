//! Price level with FIFO queue
//!
//! A price level holds every resting order at one price on one side.
//! Orders keep strict arrival order so time priority holds within the
//! level, and the running total tracks the sum of remaining
//! quantities.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

/// Entry in the price level queue
#[derive(Debug, Clone, PartialEq)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub remaining: Quantity,
}

/// All orders resting at a single price, oldest first.
///
/// Invariant: `total_quantity = Σ entry.remaining ≥ 0`.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    orders: VecDeque<LevelEntry>,
    total_quantity: Quantity,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Append an order at the back of the queue (time priority).
    pub fn push_back(&mut self, order_id: OrderId, remaining: Quantity) {
        debug_assert!(!remaining.is_zero(), "entry must carry quantity");
        self.orders.push_back(LevelEntry {
            order_id,
            remaining,
        });
        self.total_quantity = self.total_quantity + remaining;
    }

    /// Oldest entry at this level, without removing it.
    pub fn head(&self) -> Option<&LevelEntry> {
        self.orders.front()
    }

    /// Remove an order by id. Returns its remaining quantity if found.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Quantity> {
        let position = self
            .orders
            .iter()
            .position(|entry| entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining);
        Some(entry.remaining)
    }

    /// Set a new remaining quantity for an order (head partial fill).
    /// Adjusts the level total by the difference. Returns false when
    /// the order is not at this level.
    pub fn adjust(&mut self, order_id: OrderId, new_remaining: Quantity) -> bool {
        let Some(entry) = self
            .orders
            .iter_mut()
            .find(|entry| entry.order_id == order_id)
        else {
            return false;
        };
        let old = entry.remaining;
        entry.remaining = new_remaining;
        self.total_quantity = self.total_quantity.saturating_sub(old) + new_remaining;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Entries in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelEntry> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_accumulates_total() {
        let mut level = PriceLevel::new();
        level.push_back(OrderId::new(), Quantity::from_str("1.5").unwrap());
        level.push_back(OrderId::new(), Quantity::from_str("2.5").unwrap());
        level.push_back(OrderId::new(), Quantity::from_str("3.0").unwrap());

        assert_eq!(level.order_count(), 3);
        assert_eq!(level.total_quantity(), Quantity::from_str("7.0").unwrap());
    }

    #[test]
    fn test_fifo_head() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        level.push_back(first, Quantity::from_u64(1));
        level.push_back(OrderId::new(), Quantity::from_u64(2));

        assert_eq!(level.head().unwrap().order_id, first);
    }

    #[test]
    fn test_remove_updates_total() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        let second = OrderId::new();
        level.push_back(first, Quantity::from_u64(1));
        level.push_back(second, Quantity::from_u64(2));

        assert_eq!(level.remove(first), Some(Quantity::from_u64(1)));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_u64(2));
        assert_eq!(level.head().unwrap().order_id, second);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut level = PriceLevel::new();
        level.push_back(OrderId::new(), Quantity::from_u64(1));
        assert_eq!(level.remove(OrderId::new()), None);
        assert_eq!(level.total_quantity(), Quantity::from_u64(1));
    }

    #[test]
    fn test_adjust_moves_total_by_difference() {
        let mut level = PriceLevel::new();
        let id = OrderId::new();
        level.push_back(id, Quantity::from_u64(5));
        level.push_back(OrderId::new(), Quantity::from_u64(3));

        assert!(level.adjust(id, Quantity::from_u64(2)));
        assert_eq!(level.total_quantity(), Quantity::from_u64(5));
        assert_eq!(level.head().unwrap().remaining, Quantity::from_u64(2));
    }

    #[test]
    fn test_total_equals_sum_of_entries() {
        let mut level = PriceLevel::new();
        let ids: Vec<OrderId> = (0..4).map(|_| OrderId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            level.push_back(*id, Quantity::from_u64(i as u64 + 1));
        }
        level.remove(ids[1]);
        level.adjust(ids[2], Quantity::from_u64(1));

        let sum = level
            .iter()
            .fold(Quantity::zero(), |acc, e| acc + e.remaining);
        assert_eq!(level.total_quantity(), sum);
    }

    #[test]
    fn test_empty_level_has_zero_total() {
        let mut level = PriceLevel::new();
        let id = OrderId::new();
        level.push_back(id, Quantity::from_u64(1));
        level.remove(id);
        assert!(level.is_empty());
        assert!(level.total_quantity().is_zero());
    }
}
