//! Event structures and the broadcast bus
//!
//! Three channels fan events out to subscribers: trades, order state
//! changes, and order book deltas. Delivery is best-effort after the
//! storage commit; subscribers that lag or disconnect lose messages
//! silently.

use crate::book::{BookSnapshot, LevelView};
use serde::Serialize;
use tokio::sync::broadcast;
use types::ids::{OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

/// Book deltas carry the top N levels per side.
pub const BOOK_DELTA_DEPTH: usize = 20;

/// Trade executed.
#[derive(Debug, Clone, Serialize)]
pub struct TradeEvent {
    pub event_type: &'static str,
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub instrument: String,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64,
}

impl From<&Trade> for TradeEvent {
    fn from(trade: &Trade) -> Self {
        Self {
            event_type: "trade",
            trade_id: trade.trade_id,
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            instrument: trade.instrument.clone(),
            price: trade.price,
            quantity: trade.quantity,
            executed_at: trade.executed_at,
        }
    }
}

/// Full order record after a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStateChangeEvent {
    pub event_type: &'static str,
    #[serde(flatten)]
    pub order: Order,
}

impl From<&Order> for OrderStateChangeEvent {
    fn from(order: &Order) -> Self {
        Self {
            event_type: "order_state_change",
            order: order.clone(),
        }
    }
}

/// Top-of-book delta after trades or a cancel.
#[derive(Debug, Clone, Serialize)]
pub struct BookDeltaEvent {
    pub event_type: &'static str,
    pub instrument: String,
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
    pub snapshot_time: i64,
}

impl From<&BookSnapshot> for BookDeltaEvent {
    fn from(snapshot: &BookSnapshot) -> Self {
        let top = snapshot.top(BOOK_DELTA_DEPTH);
        Self {
            event_type: "orderbook_delta",
            instrument: top.instrument,
            bids: top.bids,
            asks: top.asks,
            snapshot_time: top.snapshot_time,
        }
    }
}

/// Broadcast fan-out for the three event channels.
///
/// Senders never block; `send` on a channel with no subscribers is a
/// no-op, and a lagging receiver skips ahead, dropping what it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    trades: broadcast::Sender<TradeEvent>,
    orders: broadcast::Sender<OrderStateChangeEvent>,
    book_deltas: broadcast::Sender<BookDeltaEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (trades, _) = broadcast::channel(capacity);
        let (orders, _) = broadcast::channel(capacity);
        let (book_deltas, _) = broadcast::channel(capacity);
        Self {
            trades,
            orders,
            book_deltas,
        }
    }

    pub fn publish_trade(&self, event: TradeEvent) {
        let _ = self.trades.send(event);
    }

    pub fn publish_order(&self, event: OrderStateChangeEvent) {
        let _ = self.orders.send(event);
    }

    pub fn publish_book_delta(&self, event: BookDeltaEvent) {
        let _ = self.book_deltas.send(event);
    }

    pub fn subscribe_trades(&self) -> broadcast::Receiver<TradeEvent> {
        self.trades.subscribe()
    }

    pub fn subscribe_orders(&self) -> broadcast::Receiver<OrderStateChangeEvent> {
        self.orders.subscribe()
    }

    pub fn subscribe_book_deltas(&self) -> broadcast::Receiver<BookDeltaEvent> {
        self.book_deltas.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
