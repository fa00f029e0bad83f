//! Order book infrastructure
//!
//! Per-instrument book: a bid side, an ask side, and an id lookup for
//! cancels. All mutation happens on the matching worker thread; every
//! mutation republishes the instrument snapshot.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;
pub mod snapshot;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::{LevelEntry, PriceLevel};
pub use snapshot::{BookSnapshot, LevelView, SnapshotRegistry};

use std::collections::HashMap;
use std::sync::Arc;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::time::unix_nanos_now;

/// A resting order's in-book record.
///
/// The containing level is addressed by `(side, price)` rather than a
/// pointer, so there is no entry/level reference cycle; market orders
/// carry no price and never join a level.
#[derive(Debug, Clone, PartialEq)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Option<Price>,
    pub remaining: Quantity,
    pub created_at: i64,
    pub client_id: String,
}

impl BookEntry {
    pub fn is_limit(&self) -> bool {
        self.price.is_some()
    }
}

/// In-memory order book for a single instrument.
///
/// Owned exclusively by the matching worker. Readers get state through
/// the snapshots published into the shared [`SnapshotRegistry`].
#[derive(Debug)]
pub struct OrderBook {
    instrument: String,
    bids: BidBook,
    asks: AskBook,
    by_id: HashMap<OrderId, BookEntry>,
    registry: Arc<SnapshotRegistry>,
}

impl OrderBook {
    pub fn new(instrument: impl Into<String>, registry: Arc<SnapshotRegistry>) -> Self {
        let book = Self {
            instrument: instrument.into(),
            bids: BidBook::new(),
            asks: AskBook::new(),
            by_id: HashMap::new(),
            registry,
        };
        book.republish();
        book
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Add a limit order: create the entry, insert it into its side's
    /// level (creating the level if absent), update the id map.
    #[allow(clippy::too_many_arguments)]
    pub fn add_limit(
        &mut self,
        order_id: OrderId,
        price: Price,
        remaining: Quantity,
        created_at: i64,
        client_id: impl Into<String>,
        side: Side,
    ) -> &BookEntry {
        match side {
            Side::Buy => self.bids.insert(price, order_id, remaining),
            Side::Sell => self.asks.insert(price, order_id, remaining),
        }
        self.by_id.insert(
            order_id,
            BookEntry {
                order_id,
                side,
                price: Some(price),
                remaining,
                created_at,
                client_id: client_id.into(),
            },
        );
        self.republish();
        // Just inserted above
        &self.by_id[&order_id]
    }

    /// Record a market order in the id map only; market orders never
    /// enter a price level.
    pub fn add_market(
        &mut self,
        order_id: OrderId,
        remaining: Quantity,
        created_at: i64,
        client_id: impl Into<String>,
        side: Side,
    ) -> &BookEntry {
        self.by_id.insert(
            order_id,
            BookEntry {
                order_id,
                side,
                price: None,
                remaining,
                created_at,
                client_id: client_id.into(),
            },
        );
        self.republish();
        &self.by_id[&order_id]
    }

    /// Remove an order from the book (cancel or full fill). Drops the
    /// level if it empties. Returns true if the order was present.
    pub fn remove(&mut self, order_id: OrderId) -> bool {
        let Some(entry) = self.by_id.remove(&order_id) else {
            return false;
        };
        if let Some(price) = entry.price {
            match entry.side {
                Side::Buy => self.bids.remove(order_id, price),
                Side::Sell => self.asks.remove(order_id, price),
            };
        }
        self.republish();
        true
    }

    /// Adjust an order's remaining quantity and its level's total.
    pub fn update_remaining(&mut self, order_id: OrderId, new_remaining: Quantity) {
        let Some(entry) = self.by_id.get_mut(&order_id) else {
            return;
        };
        entry.remaining = new_remaining;
        if let Some(price) = entry.price {
            match entry.side {
                Side::Buy => self.bids.adjust(order_id, price, new_remaining),
                Side::Sell => self.asks.adjust(order_id, price, new_remaining),
            };
        }
        self.republish();
    }

    pub fn entry(&self, order_id: OrderId) -> Option<&BookEntry> {
        self.by_id.get(&order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.by_id.contains_key(&order_id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Price and oldest entry of the named side's best level.
    pub fn head_of(&self, side: Side) -> Option<(Price, LevelEntry)> {
        match side {
            Side::Buy => self.bids.best_head(),
            Side::Sell => self.asks.best_head(),
        }
    }

    /// Build a full-depth immutable snapshot.
    pub fn snapshot(&self) -> BookSnapshot {
        let to_views = |levels: Vec<(Price, Quantity)>| {
            levels
                .into_iter()
                .map(|(price, quantity)| LevelView { price, quantity })
                .collect()
        };
        BookSnapshot {
            instrument: self.instrument.clone(),
            snapshot_time: unix_nanos_now(),
            bids: to_views(self.bids.depth(usize::MAX)),
            asks: to_views(self.asks.depth(usize::MAX)),
        }
    }

    fn republish(&self) {
        self.registry.publish(self.snapshot());
    }

    #[cfg(test)]
    pub(crate) fn level_total(&self, side: Side, price: Price) -> Option<Quantity> {
        match side {
            Side::Buy => self.bids.level(price).map(|l| l.total_quantity()),
            Side::Sell => self.asks.level(price).map(|l| l.total_quantity()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_book() -> OrderBook {
        OrderBook::new("BTC-USD", Arc::new(SnapshotRegistry::new()))
    }

    #[test]
    fn test_add_limit_and_cancel() {
        let mut book = test_book();
        let id = OrderId::new();
        book.add_limit(
            id,
            Price::from_u64(100),
            Quantity::from_u64(10),
            1,
            "c1",
            Side::Buy,
        );
        assert_eq!(book.best_bid(), Some(Price::from_u64(100)));
        assert!(book.contains(id));

        assert!(book.remove(id));
        assert!(book.best_bid().is_none());
        assert!(!book.contains(id));
        assert!(!book.remove(id));
    }

    #[test]
    fn test_add_market_never_enters_level() {
        let mut book = test_book();
        let id = OrderId::new();
        book.add_market(id, Quantity::from_u64(5), 1, "c1", Side::Buy);
        assert!(book.contains(id));
        assert!(book.best_bid().is_none());
        assert!(book.snapshot().bids.is_empty());
    }

    #[test]
    fn test_update_remaining_adjusts_level_total() {
        let mut book = test_book();
        let id = OrderId::new();
        book.add_limit(
            id,
            Price::from_u64(100),
            Quantity::from_u64(10),
            1,
            "c1",
            Side::Sell,
        );
        book.add_limit(
            OrderId::new(),
            Price::from_u64(100),
            Quantity::from_u64(4),
            2,
            "c2",
            Side::Sell,
        );
        book.update_remaining(id, Quantity::from_u64(3));

        assert_eq!(
            book.level_total(Side::Sell, Price::from_u64(100)),
            Some(Quantity::from_u64(7))
        );
        assert_eq!(book.entry(id).unwrap().remaining, Quantity::from_u64(3));
    }

    #[test]
    fn test_head_of_respects_fifo() {
        let mut book = test_book();
        let first = OrderId::new();
        book.add_limit(
            first,
            Price::from_u64(100),
            Quantity::from_u64(1),
            1,
            "c1",
            Side::Sell,
        );
        book.add_limit(
            OrderId::new(),
            Price::from_u64(100),
            Quantity::from_u64(2),
            2,
            "c2",
            Side::Sell,
        );

        let (price, head) = book.head_of(Side::Sell).unwrap();
        assert_eq!(price, Price::from_u64(100));
        assert_eq!(head.order_id, first);
    }

    #[test]
    fn test_snapshot_published_on_mutation() {
        let registry = Arc::new(SnapshotRegistry::new());
        let mut book = OrderBook::new("BTC-USD", registry.clone());
        assert!(registry.get("BTC-USD").unwrap().bids.is_empty());

        book.add_limit(
            OrderId::new(),
            Price::from_u64(101),
            Quantity::from_u64(2),
            1,
            "c1",
            Side::Buy,
        );
        let snap = registry.get("BTC-USD").unwrap();
        assert_eq!(snap.best_bid(), Some(Price::from_u64(101)));
    }

    #[test]
    fn test_snapshot_sides_sorted_best_first() {
        let mut book = test_book();
        for p in [101u64, 99, 100] {
            book.add_limit(
                OrderId::new(),
                Price::from_u64(p),
                Quantity::from_u64(1),
                1,
                "c1",
                Side::Buy,
            );
        }
        for p in [103u64, 105, 104] {
            book.add_limit(
                OrderId::new(),
                Price::from_u64(p),
                Quantity::from_u64(1),
                1,
                "c1",
                Side::Sell,
            );
        }
        let snap = book.snapshot();
        let bid_prices: Vec<Price> = snap.bids.iter().map(|l| l.price).collect();
        let ask_prices: Vec<Price> = snap.asks.iter().map(|l| l.price).collect();
        assert_eq!(
            bid_prices,
            vec![
                Price::from_u64(101),
                Price::from_u64(100),
                Price::from_u64(99)
            ]
        );
        assert_eq!(
            ask_prices,
            vec![
                Price::from_u64(103),
                Price::from_u64(104),
                Price::from_u64(105)
            ]
        );
    }
}
