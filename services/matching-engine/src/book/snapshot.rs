//! Immutable book snapshots and the cross-thread registry
//!
//! The matching worker owns the books; readers never touch them.
//! After every mutation the worker publishes a fresh immutable
//! snapshot into the registry by replacing the `Arc` wholesale, so a
//! reader sees a state at most one command behind the writer.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use types::numeric::{Price, Quantity};

/// One (price, total quantity) pair in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelView {
    pub price: Price,
    pub quantity: Quantity,
}

/// Immutable view of one instrument's book.
///
/// Bids are in descending price order, asks ascending; both carry full
/// depth. Top-N capping happens at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub instrument: String,
    pub snapshot_time: i64, // Unix nanos
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
}

impl BookSnapshot {
    pub fn empty(instrument: impl Into<String>, snapshot_time: i64) -> Self {
        Self {
            instrument: instrument.into(),
            snapshot_time,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Copy capped to the top `depth` levels per side.
    pub fn top(&self, depth: usize) -> Self {
        Self {
            instrument: self.instrument.clone(),
            snapshot_time: self.snapshot_time,
            bids: self.bids.iter().take(depth).cloned().collect(),
            asks: self.asks.iter().take(depth).cloned().collect(),
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }
}

/// Atomically-published snapshots per instrument.
///
/// The writer replaces the stored `Arc` on every publish; readers
/// clone the `Arc` and work with an immutable value.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    books: DashMap<String, Arc<BookSnapshot>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot for the instrument.
    pub fn publish(&self, snapshot: BookSnapshot) {
        self.books
            .insert(snapshot.instrument.clone(), Arc::new(snapshot));
    }

    /// Most recently published snapshot, if the instrument exists.
    pub fn get(&self, instrument: &str) -> Option<Arc<BookSnapshot>> {
        self.books.get(instrument).map(|entry| entry.value().clone())
    }

    /// Known instruments (those that published at least once).
    pub fn instruments(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: u64, qty: u64) -> LevelView {
        LevelView {
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(qty),
        }
    }

    #[test]
    fn test_top_caps_depth() {
        let snapshot = BookSnapshot {
            instrument: "BTC-USD".into(),
            snapshot_time: 1,
            bids: vec![level(102, 1), level(101, 2), level(100, 3)],
            asks: vec![level(103, 1), level(104, 2)],
        };
        let top = snapshot.top(2);
        assert_eq!(top.bids.len(), 2);
        assert_eq!(top.asks.len(), 2);
        assert_eq!(top.best_bid(), Some(Price::from_u64(102)));
        assert_eq!(top.best_ask(), Some(Price::from_u64(103)));
    }

    #[test]
    fn test_registry_publish_replaces() {
        let registry = SnapshotRegistry::new();
        registry.publish(BookSnapshot::empty("BTC-USD", 1));
        registry.publish(BookSnapshot {
            instrument: "BTC-USD".into(),
            snapshot_time: 2,
            bids: vec![level(100, 1)],
            asks: vec![],
        });

        let current = registry.get("BTC-USD").unwrap();
        assert_eq!(current.snapshot_time, 2);
        assert_eq!(current.bids.len(), 1);
        assert!(registry.get("ETH-USD").is_none());
    }

    #[test]
    fn test_old_snapshot_survives_republish() {
        let registry = SnapshotRegistry::new();
        registry.publish(BookSnapshot::empty("BTC-USD", 1));
        let held = registry.get("BTC-USD").unwrap();
        registry.publish(BookSnapshot::empty("BTC-USD", 2));
        // A reader holding the old Arc still sees a consistent view
        assert_eq!(held.snapshot_time, 1);
        assert_eq!(registry.get("BTC-USD").unwrap().snapshot_time, 2);
    }
}
