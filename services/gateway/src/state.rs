//! Shared application state

use crate::rate_limit::RateLimiter;
use matching_engine::{EngineHandle, EventBus, SnapshotRegistry};
use persistence::OrderStore;
use std::sync::Arc;

/// Orders-per-second budget for a single client.
pub const PLACEMENT_RATE_CAPACITY: u32 = 20;
pub const PLACEMENT_RATE_REFILL: f64 = 20.0;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub engine: Arc<EngineHandle>,
    pub snapshots: Arc<SnapshotRegistry>,
    pub events: EventBus,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        engine: Arc<EngineHandle>,
        snapshots: Arc<SnapshotRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            engine,
            snapshots,
            events,
            rate_limiter: Arc::new(RateLimiter::new()),
        }
    }
}
