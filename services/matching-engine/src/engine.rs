//! Single-writer matching engine
//!
//! One worker thread drains a bounded command queue and applies every
//! state transition: defensive validation, the matching sweep, the
//! storage commit (trades before order rows, under retry), and event
//! emission after the commit. Producers only enqueue; a full queue
//! rejects the enqueue without blocking.
//!
//! Store failures that survive the retry policy pause the worker with
//! a second-tier backoff; the command is dropped and the store keeps
//! the order's last durable state. The queue continues to accept up
//! to its capacity while paused.

use crate::book::{OrderBook, SnapshotRegistry};
use crate::command::Command;
use crate::events::{BookDeltaEvent, EventBus, OrderStateChangeEvent, TradeEvent};
use crate::matching::{match_limit, match_market, MatchOutcome};
use crate::recovery;
use persistence::{OrderStore, RetryPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use types::errors::OrderError;
use types::ids::OrderId;
use types::order::Order;
use types::time::unix_nanos_now;

/// How often the blocked worker re-checks the stop flag.
const DEQUEUE_TICK: Duration = Duration::from_millis(100);

/// How long shutdown waits for the in-flight command.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounded queue capacity; enqueue beyond it is rejected.
    pub queue_capacity: usize,
    /// Retry policy around each storage commit.
    pub retry: RetryPolicy,
    /// First pause after a commit exhausts its retries.
    pub pause_initial: Duration,
    /// Pause backoff cap.
    pub pause_max: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            retry: RetryPolicy::default(),
            pause_initial: Duration::from_secs(1),
            pause_max: Duration::from_secs(10),
        }
    }
}

// ── Enqueue errors ──────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnqueueError {
    /// Queue at capacity; intake surfaces this as service-unavailable.
    #[error("matching queue is full")]
    QueueFull,

    /// The worker has shut down.
    #[error("matching engine is not running")]
    Closed,
}

// ── Handle ──────────────────────────────────────────────────────────

/// Producer-side handle to the engine.
///
/// Enqueueing is non-blocking. Shutdown stops the worker after its
/// in-flight command; commands still queued are lost here but remain
/// persisted as open and are re-inserted by recovery on next startup.
pub struct EngineHandle {
    tx: SyncSender<Command>,
    depth: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EngineHandle {
    pub fn enqueue_place(&self, order: Order) -> Result<(), EnqueueError> {
        self.enqueue(Command::Place(Box::new(order)))
    }

    pub fn enqueue_cancel(&self, order_id: OrderId) -> Result<(), EnqueueError> {
        self.enqueue(Command::Cancel(order_id))
    }

    fn enqueue(&self, command: Command) -> Result<(), EnqueueError> {
        match self.tx.try_send(command) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                error!(
                    depth = self.queue_depth(),
                    "matching queue is full, rejecting command"
                );
                Err(EnqueueError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(EnqueueError::Closed),
        }
    }

    /// Commands currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the worker, waiting up to 5 s for the in-flight command.
    /// A worker stuck past that (e.g. deep in a pause backoff) is
    /// abandoned; its queued commands are re-processed by recovery.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .worker
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    warn!("matching worker panicked before shutdown");
                }
            } else {
                warn!("matching worker did not stop in time, abandoning");
            }
        }
        info!("matching engine stopped");
    }

    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (
            Self {
                tx,
                depth: Arc::new(AtomicUsize::new(0)),
                running: Arc::new(AtomicBool::new(true)),
                worker: Mutex::new(None),
            },
            rx,
        )
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Entry point: recover, then start the worker.
pub struct MatchingEngine;

impl MatchingEngine {
    /// Run recovery and spawn the matching worker.
    ///
    /// Recovery failure is logged and startup proceeds with whatever
    /// state was reconstructed; a partial book beats no book.
    pub fn start(
        config: EngineConfig,
        store: Arc<dyn OrderStore>,
        registry: Arc<SnapshotRegistry>,
        events: EventBus,
    ) -> EngineHandle {
        let books = match recovery::recover_books(store.as_ref(), registry.clone()) {
            Ok((books, recovered)) => {
                info!(recovered, "recovery finished, starting matching engine");
                books
            }
            Err(e) => {
                error!(error = %e, "recovery failed, continuing with empty books");
                HashMap::new()
            }
        };

        let mut core = EngineCore::with_books(config.clone(), store, registry, events, books);
        let running = Arc::new(AtomicBool::new(true));
        let depth = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::sync_channel(config.queue_capacity);

        let worker_running = running.clone();
        let worker_depth = depth.clone();
        let worker = std::thread::spawn(move || {
            info!("matching worker started");
            while worker_running.load(Ordering::SeqCst) {
                match rx.recv_timeout(DEQUEUE_TICK) {
                    Ok(command) => {
                        worker_depth.fetch_sub(1, Ordering::SeqCst);
                        core.execute(command);
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("matching worker stopped");
        });

        EngineHandle {
            tx,
            depth,
            running,
            worker: Mutex::new(Some(worker)),
        }
    }
}

// ── Core (single-threaded state transitions) ────────────────────────

/// All engine state and per-command logic, confined to one thread.
///
/// Public so tests can drive commands synchronously; production code
/// reaches it only through [`MatchingEngine::start`].
pub struct EngineCore {
    config: EngineConfig,
    store: Arc<dyn OrderStore>,
    registry: Arc<SnapshotRegistry>,
    events: EventBus,
    books: HashMap<String, OrderBook>,
    pause_backoff: Duration,
}

impl EngineCore {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn OrderStore>,
        registry: Arc<SnapshotRegistry>,
        events: EventBus,
    ) -> Self {
        let pause_initial = config.pause_initial;
        Self {
            config,
            store,
            registry,
            events,
            books: HashMap::new(),
            pause_backoff: pause_initial,
        }
    }

    fn with_books(
        config: EngineConfig,
        store: Arc<dyn OrderStore>,
        registry: Arc<SnapshotRegistry>,
        events: EventBus,
        books: HashMap<String, OrderBook>,
    ) -> Self {
        let mut core = Self::new(config, store, registry, events);
        core.books = books;
        core
    }

    /// Apply one command. Never propagates: every failure path logs
    /// and leaves the engine able to take the next command.
    pub fn execute(&mut self, command: Command) {
        match command {
            Command::Place(order) => self.handle_place(*order),
            Command::Cancel(order_id) => self.handle_cancel(order_id),
        }
    }

    // ── Place ───────────────────────────────────────────────────

    fn handle_place(&mut self, mut order: Order) {
        let now = unix_nanos_now();

        if let Err(e) = validate_order(&order) {
            warn!(order_id = %order.order_id, error = %e, "rejecting order");
            order.reject(now);
            // Best effort; the row keeps its open status if this fails
            if let Err(e) = self
                .config
                .retry
                .run("persist-rejected-order", || {
                    self.store.save_orders(std::slice::from_ref(&order))
                })
            {
                error!(order_id = %order.order_id, error = %e, "failed to persist rejected order");
            }
            return;
        }

        let book = self
            .books
            .entry(order.instrument.clone())
            .or_insert_with(|| OrderBook::new(order.instrument.clone(), self.registry.clone()));

        let result = if order.is_market() {
            match_market(book, self.store.as_ref(), &mut order, now)
        } else {
            // Validated above: limit orders carry a price
            match order.price {
                Some(price) => match_limit(book, self.store.as_ref(), &mut order, price, now),
                None => {
                    warn!(order_id = %order.order_id, "limit order without price after validation");
                    return;
                }
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    order_id = %order.order_id,
                    error = %e,
                    "matching failed on store read, pausing engine"
                );
                self.pause();
                return;
            }
        };

        let instrument = order.instrument.clone();
        match self.config.retry.run("commit-execution", || {
            self.store
                .commit_execution(&outcome.trades, &outcome.order_updates)
        }) {
            Ok(()) => {
                self.pause_backoff = self.config.pause_initial;
                self.emit_execution(&instrument, &outcome);
            }
            Err(e) => {
                error!(
                    order_id = %order.order_id,
                    error = %e,
                    "commit failed after retries, pausing engine"
                );
                self.pause();
            }
        }
    }

    // ── Cancel ──────────────────────────────────────────────────

    fn handle_cancel(&mut self, order_id: OrderId) {
        let now = unix_nanos_now();

        let stored = match self.store.find_by_id(order_id) {
            Ok(found) => found,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "cancel lookup failed, pausing engine");
                self.pause();
                return;
            }
        };
        let Some(mut order) = stored else {
            warn!(order_id = %order_id, "cancel for unknown order, ignoring");
            return;
        };

        let Some(book) = self.books.get_mut(&order.instrument) else {
            debug!(order_id = %order_id, "no book for instrument, cancel is a no-op");
            return;
        };
        if !book.remove(order_id) {
            // Already filled or never rested; the queue ordering
            // guarantees any earlier cancel would have run first.
            debug!(order_id = %order_id, "order not in book, cancel is a no-op");
            return;
        }

        if !order.status.is_live() {
            warn!(
                order_id = %order_id,
                status = ?order.status,
                "terminal order was still in the book"
            );
            return;
        }
        order.cancel(now);

        // Cancellation already took effect in the book; a persist
        // failure is logged rather than escalated to a pause.
        match self.config.retry.run("persist-cancel", || {
            self.store.save_orders(std::slice::from_ref(&order))
        }) {
            Ok(()) => {
                info!(order_id = %order_id, instrument = %order.instrument, "order cancelled");
                self.events
                    .publish_order(OrderStateChangeEvent::from(&order));
                if let Some(snapshot) = self.registry.get(&order.instrument) {
                    self.events
                        .publish_book_delta(BookDeltaEvent::from(snapshot.as_ref()));
                }
            }
            Err(e) => {
                error!(order_id = %order_id, error = %e, "failed to persist cancellation");
            }
        }
    }

    // ── Shared ──────────────────────────────────────────────────

    /// Broadcast the results of a committed place command.
    fn emit_execution(&self, instrument: &str, outcome: &MatchOutcome) {
        for trade in &outcome.trades {
            info!(
                trade_id = %trade.trade_id,
                instrument = %trade.instrument,
                price = %trade.price,
                quantity = %trade.quantity,
                "trade executed"
            );
            self.events.publish_trade(TradeEvent::from(trade));
        }
        for order in &outcome.order_updates {
            info!(
                order_id = %order.order_id,
                status = ?order.status,
                filled_quantity = %order.filled_quantity,
                "order state changed"
            );
            self.events
                .publish_order(OrderStateChangeEvent::from(order));
        }
        if !outcome.trades.is_empty() {
            if let Some(snapshot) = self.registry.get(instrument) {
                self.events
                    .publish_book_delta(BookDeltaEvent::from(snapshot.as_ref()));
            }
        }
    }

    /// Second-tier backoff once the retry policy is exhausted. The
    /// queue keeps accepting while we sleep.
    fn pause(&mut self) {
        warn!(
            pause_ms = self.pause_backoff.as_millis() as u64,
            "matching engine paused"
        );
        std::thread::sleep(self.pause_backoff);
        self.pause_backoff = (self.pause_backoff * 2).min(self.config.pause_max);
        info!("matching engine resuming after pause");
    }

    #[cfg(test)]
    pub(crate) fn book(&self, instrument: &str) -> Option<&OrderBook> {
        self.books.get(instrument)
    }
}

/// Defensive validation inside the engine. Intake validates first;
/// this guards against commands that bypassed it.
fn validate_order(order: &Order) -> Result<(), OrderError> {
    if order.instrument.trim().is_empty() {
        return Err(OrderError::InvalidInstrument("instrument is empty".into()));
    }
    if order.quantity.is_zero() {
        return Err(OrderError::InvalidQuantity("quantity must be positive".into()));
    }
    if order.is_limit() && order.price.is_none() {
        return Err(OrderError::InvalidPrice("limit order requires a price".into()));
    }
    Ok(())
}
