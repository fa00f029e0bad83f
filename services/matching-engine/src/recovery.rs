//! Recovery — rebuild books from the store on startup
//!
//! Scans live orders (open / partially_filled) in creation order and
//! re-inserts them without matching; ascending created_at preserves
//! FIFO within each price level. Per-order failures are logged and
//! skipped so one bad row cannot abort recovery.

use crate::book::{OrderBook, SnapshotRegistry};
use persistence::{OrderStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::order::Order;

/// Rebuild the per-instrument books. Returns the books and the number
/// of orders restored.
pub fn recover_books(
    store: &dyn OrderStore,
    registry: Arc<SnapshotRegistry>,
) -> Result<(HashMap<String, OrderBook>, usize), StoreError> {
    let live = store.scan_live_orders()?;
    info!(count = live.len(), "recovering order books from store");

    let mut books: HashMap<String, OrderBook> = HashMap::new();
    let mut recovered = 0;
    for order in &live {
        if restore_order(&mut books, &registry, order) {
            recovered += 1;
        }
    }

    info!(recovered, "order book recovery complete");
    Ok((books, recovered))
}

fn restore_order(
    books: &mut HashMap<String, OrderBook>,
    registry: &Arc<SnapshotRegistry>,
    order: &Order,
) -> bool {
    let remaining = order.remaining();
    if remaining.is_zero() {
        warn!(order_id = %order.order_id, "live order has no remaining quantity, skipping");
        return false;
    }

    let book = books
        .entry(order.instrument.clone())
        .or_insert_with(|| OrderBook::new(order.instrument.clone(), registry.clone()));

    if order.is_limit() {
        let Some(price) = order.price else {
            warn!(order_id = %order.order_id, "limit order has no price, skipping");
            return false;
        };
        book.add_limit(
            order.order_id,
            price,
            remaining,
            order.created_at,
            order.client_id.clone(),
            order.side,
        );
        debug!(
            order_id = %order.order_id,
            instrument = %order.instrument,
            price = %price,
            remaining = %remaining,
            "recovered limit order"
        );
        true
    } else {
        // Market orders resolve synchronously, so a live one can only
        // mean the process died with the command still queued. One
        // with fills should have been finalized; skip it.
        if order.has_fills() {
            warn!(
                order_id = %order.order_id,
                "partially filled market order in store, skipping"
            );
            return false;
        }
        book.add_market(
            order.order_id,
            remaining,
            order.created_at,
            order.client_id.clone(),
            order.side,
        );
        debug!(
            order_id = %order.order_id,
            instrument = %order.instrument,
            remaining = %remaining,
            "recovered market order"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;
    use types::numeric::{Price, Quantity};
    use types::order::{OrderKind, OrderStatus, Side};

    fn order(
        instrument: &str,
        side: Side,
        kind: OrderKind,
        price: Option<u64>,
        qty: u64,
        created_at: i64,
    ) -> Order {
        let mut o = Order::new(
            "client-1",
            instrument,
            side,
            kind,
            price.map(Price::from_u64),
            Quantity::from_u64(qty),
            None,
            created_at,
        );
        o.created_at = created_at;
        o
    }

    #[test]
    fn test_recovers_live_limit_orders() {
        let store = MemoryStore::new();
        store
            .insert_order(&order("BTC-USD", Side::Sell, OrderKind::Limit, Some(100), 10, 1))
            .unwrap();
        store
            .insert_order(&order("BTC-USD", Side::Sell, OrderKind::Limit, Some(101), 10, 2))
            .unwrap();
        store
            .insert_order(&order("ETH-USD", Side::Buy, OrderKind::Limit, Some(50), 5, 3))
            .unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, recovered) = recover_books(&store, registry.clone()).unwrap();

        assert_eq!(recovered, 3);
        assert_eq!(books.len(), 2);
        let btc = registry.get("BTC-USD").unwrap();
        assert_eq!(btc.asks.len(), 2);
        assert_eq!(btc.best_ask(), Some(Price::from_u64(100)));
        assert_eq!(registry.get("ETH-USD").unwrap().best_bid(), Some(Price::from_u64(50)));
    }

    #[test]
    fn test_skips_terminal_orders() {
        let store = MemoryStore::new();
        let mut filled = order("BTC-USD", Side::Sell, OrderKind::Limit, Some(100), 10, 1);
        filled.apply_fill(Quantity::from_u64(10), 2);
        store.insert_order(&filled).unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, recovered) = recover_books(&store, registry).unwrap();
        assert_eq!(recovered, 0);
        assert!(books.is_empty());
    }

    #[test]
    fn test_partially_filled_limit_restores_remaining() {
        let store = MemoryStore::new();
        let mut partial = order("BTC-USD", Side::Buy, OrderKind::Limit, Some(100), 10, 1);
        partial.apply_fill(Quantity::from_u64(4), 2);
        assert_eq!(partial.status, OrderStatus::PartiallyFilled);
        store.insert_order(&partial).unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, recovered) = recover_books(&store, registry.clone()).unwrap();
        assert_eq!(recovered, 1);
        let entry = books["BTC-USD"].entry(partial.order_id).unwrap();
        assert_eq!(entry.remaining, Quantity::from_u64(6));
        assert_eq!(
            registry.get("BTC-USD").unwrap().bids[0].quantity,
            Quantity::from_u64(6)
        );
    }

    #[test]
    fn test_partially_filled_market_order_skipped() {
        let store = MemoryStore::new();
        let mut market = order("BTC-USD", Side::Buy, OrderKind::Market, None, 10, 1);
        market.apply_fill(Quantity::from_u64(2), 2);
        store.insert_order(&market).unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, recovered) = recover_books(&store, registry).unwrap();
        assert_eq!(recovered, 0);
        // The instrument book exists but holds nothing
        assert!(!books["BTC-USD"].contains(market.order_id));
    }

    #[test]
    fn test_unfilled_market_order_restored_outside_levels() {
        let store = MemoryStore::new();
        let market = order("BTC-USD", Side::Buy, OrderKind::Market, None, 10, 1);
        store.insert_order(&market).unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, recovered) = recover_books(&store, registry.clone()).unwrap();
        assert_eq!(recovered, 1);
        assert!(books["BTC-USD"].contains(market.order_id));
        assert!(registry.get("BTC-USD").unwrap().bids.is_empty());
    }

    #[test]
    fn test_fifo_preserved_by_created_at_order() {
        let store = MemoryStore::new();
        let older = order("BTC-USD", Side::Sell, OrderKind::Limit, Some(100), 1, 10);
        let newer = order("BTC-USD", Side::Sell, OrderKind::Limit, Some(100), 2, 20);
        // Insert newest first; recovery must still restore oldest first
        store.insert_order(&newer).unwrap();
        store.insert_order(&older).unwrap();

        let registry = Arc::new(SnapshotRegistry::new());
        let (books, _) = recover_books(&store, registry).unwrap();
        let (_, head) = books["BTC-USD"].head_of(Side::Sell).unwrap();
        assert_eq!(head.order_id, older.order_id);
    }
}
