//! Matching execution
//!
//! Runs one incoming order against the opposite side of its book:
//! sweep best levels outside-in, oldest resting entry first, trading
//! at the resting level's price. Produces the trades and every order
//! mutation for the command; the caller persists them as one unit and
//! broadcasts only after the commit.

use crate::book::OrderBook;
use crate::matching::crossing;
use persistence::{OrderStore, StoreError};
use tracing::warn;
use types::numeric::Price;
use types::order::{Order, OrderStatus};
use types::trade::Trade;

/// Everything one command produced: trades plus the mutated order
/// rows (resting counterparties and the incoming order itself).
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub order_updates: Vec<Order>,
}

/// Match a limit order. Sweeps while the price crosses; any remainder
/// rests in the book at the limit price.
pub fn match_limit(
    book: &mut OrderBook,
    store: &dyn OrderStore,
    incoming: &mut Order,
    price: Price,
    now: i64,
) -> Result<MatchOutcome, StoreError> {
    let mut outcome = MatchOutcome::default();
    sweep(book, store, incoming, Some(price), now, &mut outcome)?;

    if !incoming.remaining().is_zero() {
        book.add_limit(
            incoming.order_id,
            price,
            incoming.remaining(),
            incoming.created_at,
            incoming.client_id.clone(),
            incoming.side,
        );
        // Status is Open when nothing filled, PartiallyFilled otherwise;
        // apply_fill already advanced it on the fill path.
    }
    outcome.order_updates.push(incoming.clone());
    Ok(outcome)
}

/// Match a market order: the same sweep with no price check. Market
/// orders never rest; an unfilled remainder is abandoned.
pub fn match_market(
    book: &mut OrderBook,
    store: &dyn OrderStore,
    incoming: &mut Order,
    now: i64,
) -> Result<MatchOutcome, StoreError> {
    let mut outcome = MatchOutcome::default();
    sweep(book, store, incoming, None, now, &mut outcome)?;

    if !incoming.remaining().is_zero() {
        // Book exhausted. The remainder is dropped rather than rested,
        // and the order reads partially_filled even with zero fills:
        // it was accepted and ran out of liquidity, not rejected.
        incoming.status = OrderStatus::PartiallyFilled;
        incoming.updated_at = now;
        warn!(
            order_id = %incoming.order_id,
            instrument = %incoming.instrument,
            remaining = %incoming.remaining(),
            "market order exhausted the book, remainder abandoned"
        );
    }
    outcome.order_updates.push(incoming.clone());
    Ok(outcome)
}

/// Core sweep loop shared by limit and market matching.
///
/// `limit_price` of `None` means no price-cross check (market order).
fn sweep(
    book: &mut OrderBook,
    store: &dyn OrderStore,
    incoming: &mut Order,
    limit_price: Option<Price>,
    now: i64,
    outcome: &mut MatchOutcome,
) -> Result<(), StoreError> {
    while !incoming.remaining().is_zero() {
        let Some((best_price, resting)) = book.head_of(incoming.side.opposite()) else {
            break;
        };
        if let Some(limit) = limit_price {
            if !crossing::crosses(incoming.side, limit, best_price) {
                break;
            }
        }

        let trade_qty = incoming.remaining().min(resting.remaining);
        outcome.trades.push(Trade::between(
            incoming.order_id,
            incoming.side,
            resting.order_id,
            incoming.instrument.clone(),
            best_price,
            trade_qty,
            now,
        ));

        incoming.apply_fill(trade_qty, now);
        let new_resting_qty = resting.remaining.saturating_sub(trade_qty);

        match store.find_by_id(resting.order_id)? {
            Some(mut resting_order) => {
                resting_order.apply_fill(trade_qty, now);
                outcome.order_updates.push(resting_order);
            }
            None => {
                // In the book but not in the store. Drop it from the
                // book so it cannot keep matching.
                warn!(
                    order_id = %resting.order_id,
                    "resting order missing from store"
                );
            }
        }

        if new_resting_qty.is_zero() {
            book.remove(resting.order_id);
        } else {
            book.update_remaining(resting.order_id, new_resting_qty);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::SnapshotRegistry;
    use persistence::MemoryStore;
    use std::sync::Arc;
    use types::numeric::Quantity;
    use types::order::{OrderKind, Side};

    fn new_book() -> OrderBook {
        OrderBook::new("BTC-USD", Arc::new(SnapshotRegistry::new()))
    }

    fn limit_order(side: Side, price: u64, qty: u64) -> Order {
        Order::new(
            "client-1",
            "BTC-USD",
            side,
            OrderKind::Limit,
            Some(Price::from_u64(price)),
            Quantity::from_u64(qty),
            None,
            types::time::unix_nanos_now(),
        )
    }

    fn market_order(side: Side, qty: u64) -> Order {
        Order::new(
            "client-1",
            "BTC-USD",
            side,
            OrderKind::Market,
            None,
            Quantity::from_u64(qty),
            None,
            types::time::unix_nanos_now(),
        )
    }

    /// Persist a resting order and place it into the book.
    fn rest(book: &mut OrderBook, store: &MemoryStore, order: &Order) {
        store.insert_order(order).unwrap();
        let price = order.price.unwrap();
        book.add_limit(
            order.order_id,
            price,
            order.quantity,
            order.created_at,
            order.client_id.clone(),
            order.side,
        );
    }

    #[test]
    fn test_full_cross_fills_both() {
        let mut book = new_book();
        let store = MemoryStore::new();
        let sell = limit_order(Side::Sell, 100, 10);
        rest(&mut book, &store, &sell);

        let mut buy = limit_order(Side::Buy, 100, 10);
        let outcome =
            match_limit(&mut book, &store, &mut buy, Price::from_u64(100), 1).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, Quantity::from_u64(10));
        assert_eq!(outcome.trades[0].price, Price::from_u64(100));
        assert_eq!(outcome.trades[0].buy_order_id, buy.order_id);
        assert_eq!(outcome.trades[0].sell_order_id, sell.order_id);
        assert_eq!(buy.status, OrderStatus::Filled);
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());

        let resting_update = outcome
            .order_updates
            .iter()
            .find(|o| o.order_id == sell.order_id)
            .unwrap();
        assert_eq!(resting_update.status, OrderStatus::Filled);
    }

    #[test]
    fn test_partial_fill_aggressor_rests_remainder() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 100, 50));

        let mut buy = limit_order(Side::Buy, 100, 80);
        let outcome =
            match_limit(&mut book, &store, &mut buy, Price::from_u64(100), 1).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, Quantity::from_u64(50));
        assert_eq!(buy.status, OrderStatus::PartiallyFilled);
        assert_eq!(buy.remaining(), Quantity::from_u64(30));
        assert_eq!(book.best_bid(), Some(Price::from_u64(100)));
        assert_eq!(
            book.entry(buy.order_id).unwrap().remaining,
            Quantity::from_u64(30)
        );
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn test_no_cross_rests_whole_order() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 110, 10));

        let mut buy = limit_order(Side::Buy, 100, 10);
        let outcome =
            match_limit(&mut book, &store, &mut buy, Price::from_u64(100), 1).unwrap();

        assert!(outcome.trades.is_empty());
        assert_eq!(buy.status, OrderStatus::Open);
        assert_eq!(book.best_bid(), Some(Price::from_u64(100)));
        assert_eq!(book.best_ask(), Some(Price::from_u64(110)));
    }

    #[test]
    fn test_sweep_walks_levels_best_first() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 100, 20));
        rest(&mut book, &store, &limit_order(Side::Sell, 101, 30));
        rest(&mut book, &store, &limit_order(Side::Sell, 102, 50));

        let mut buy = market_order(Side::Buy, 60);
        let outcome = match_market(&mut book, &store, &mut buy, 1).unwrap();

        assert_eq!(outcome.trades.len(), 3);
        assert_eq!(outcome.trades[0].price, Price::from_u64(100));
        assert_eq!(outcome.trades[0].quantity, Quantity::from_u64(20));
        assert_eq!(outcome.trades[1].price, Price::from_u64(101));
        assert_eq!(outcome.trades[1].quantity, Quantity::from_u64(30));
        assert_eq!(outcome.trades[2].price, Price::from_u64(102));
        assert_eq!(outcome.trades[2].quantity, Quantity::from_u64(10));
        assert_eq!(buy.status, OrderStatus::Filled);
        // 40 left at 102
        assert_eq!(book.best_ask(), Some(Price::from_u64(102)));
        assert_eq!(
            book.snapshot().asks[0].quantity,
            Quantity::from_u64(40)
        );
    }

    #[test]
    fn test_fifo_within_level() {
        let mut book = new_book();
        let store = MemoryStore::new();
        let first = limit_order(Side::Sell, 100, 5);
        let second = limit_order(Side::Sell, 100, 5);
        rest(&mut book, &store, &first);
        rest(&mut book, &store, &second);

        let mut buy = limit_order(Side::Buy, 100, 5);
        let outcome =
            match_limit(&mut book, &store, &mut buy, Price::from_u64(100), 1).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].sell_order_id, first.order_id);
        assert!(book.contains(second.order_id));
        assert!(!book.contains(first.order_id));
    }

    #[test]
    fn test_market_on_empty_book_partially_filled_zero() {
        let mut book = new_book();
        let store = MemoryStore::new();

        let mut buy = market_order(Side::Buy, 5);
        let outcome = match_market(&mut book, &store, &mut buy, 1).unwrap();

        assert!(outcome.trades.is_empty());
        assert_eq!(buy.status, OrderStatus::PartiallyFilled);
        assert!(buy.filled_quantity.is_zero());
        assert!(!book.contains(buy.order_id));
        assert!(book.snapshot().bids.is_empty());
    }

    #[test]
    fn test_market_never_rests_partial() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 100, 3));

        let mut buy = market_order(Side::Buy, 10);
        let outcome = match_market(&mut book, &store, &mut buy, 1).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(buy.status, OrderStatus::PartiallyFilled);
        assert_eq!(buy.filled_quantity, Quantity::from_u64(3));
        assert!(!book.contains(buy.order_id));
    }

    #[test]
    fn test_trade_price_is_resting_price() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 99, 10));

        // Buyer willing to pay 105 still trades at the resting 99
        let mut buy = limit_order(Side::Buy, 105, 10);
        let outcome =
            match_limit(&mut book, &store, &mut buy, Price::from_u64(105), 1).unwrap();
        assert_eq!(outcome.trades[0].price, Price::from_u64(99));
    }

    #[test]
    fn test_sell_aggressor_sweeps_bids() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Buy, 101, 5));
        rest(&mut book, &store, &limit_order(Side::Buy, 100, 5));

        let mut sell = limit_order(Side::Sell, 100, 8);
        let outcome =
            match_limit(&mut book, &store, &mut sell, Price::from_u64(100), 1).unwrap();

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, Price::from_u64(101));
        assert_eq!(outcome.trades[1].price, Price::from_u64(100));
        assert_eq!(sell.status, OrderStatus::Filled);
        // Bid at 100 keeps 2 remaining
        assert_eq!(
            book.snapshot().bids[0].quantity,
            Quantity::from_u64(2)
        );
    }

    #[test]
    fn test_no_crossed_book_after_matching() {
        let mut book = new_book();
        let store = MemoryStore::new();
        rest(&mut book, &store, &limit_order(Side::Sell, 101, 10));
        rest(&mut book, &store, &limit_order(Side::Buy, 99, 10));
        rest(&mut book, &store, &limit_order(Side::Sell, 100, 10));

        let mut buy = limit_order(Side::Buy, 100, 10);
        match_limit(&mut book, &store, &mut buy, Price::from_u64(100), 1).unwrap();

        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book must not be crossed");
        }
    }
}
