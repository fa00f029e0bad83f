//! Ask (sell-side) order book
//!
//! Sell orders sorted by price ascending (best ask first). Mirror of
//! the bid book with the opposite iteration direction.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};

/// Ask (sell) side of an order book.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels; best ask is the lowest key.
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order at its price level, creating the level if absent.
    pub fn insert(&mut self, price: Price, order_id: OrderId, remaining: Quantity) {
        self.levels
            .entry(price)
            .or_default()
            .push_back(order_id, remaining);
    }

    /// Remove an order from its level; drops the level when emptied.
    /// Returns true if the order was found.
    pub fn remove(&mut self, order_id: OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Adjust an order's remaining quantity in place.
    pub fn adjust(&mut self, order_id: OrderId, price: Price, new_remaining: Quantity) -> bool {
        self.levels
            .get_mut(&price)
            .map(|level| level.adjust(order_id, new_remaining))
            .unwrap_or(false)
    }

    /// Best ask price (lowest).
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Price and oldest entry of the best level.
    pub fn best_head(&self) -> Option<(Price, LevelEntry)> {
        self.levels
            .iter()
            .next()
            .and_then(|(price, level)| level.head().map(|entry| (*price, entry.clone())))
    }

    /// Top levels as (price, total quantity), best first.
    pub fn depth(&self, levels: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(levels)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }
}
