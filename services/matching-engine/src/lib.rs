//! Matching engine for the trade engine
//!
//! Price-time priority matching over in-memory per-instrument books,
//! driven by a single worker thread behind a bounded command queue.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced (best level first, FIFO
//!   within a level)
//! - The book is never crossed after a matching cycle
//! - Quantity conservation: an order's filled quantity equals the sum
//!   of its trades
//! - Events are broadcast only after the storage commit

pub mod book;
pub mod command;
pub mod engine;
pub mod events;
pub mod matching;
pub mod recovery;

pub use book::{BookSnapshot, LevelView, OrderBook, SnapshotRegistry};
pub use command::Command;
pub use engine::{EngineConfig, EngineCore, EngineHandle, EnqueueError, MatchingEngine};
pub use events::{BookDeltaEvent, EventBus, OrderStateChangeEvent, TradeEvent};
