//! Order book snapshot queries

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use matching_engine::BookSnapshot;
use serde::Deserialize;
use types::time::unix_nanos_now;

const DEFAULT_LEVELS: usize = 20;
const MAX_LEVELS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct OrderBookQuery {
    pub instrument: String,
    pub levels: Option<usize>,
}

/// GET /orderbook?instrument=X&levels=N
///
/// Reads the atomically-published snapshot; never touches the books.
/// An instrument with no published book returns empty sides.
pub async fn get_orderbook(
    State(state): State<AppState>,
    Query(query): Query<OrderBookQuery>,
) -> Result<Json<BookSnapshot>, AppError> {
    if query.instrument.trim().is_empty() {
        return Err(AppError::BadRequest("instrument must not be blank".into()));
    }
    let levels = query.levels.unwrap_or(DEFAULT_LEVELS);
    if !(1..=MAX_LEVELS).contains(&levels) {
        return Err(AppError::BadRequest(format!(
            "levels must be between 1 and {}",
            MAX_LEVELS
        )));
    }

    let snapshot = match state.snapshots.get(&query.instrument) {
        Some(snapshot) => snapshot.top(levels),
        None => BookSnapshot::empty(query.instrument, unix_nanos_now()),
    };
    Ok(Json(snapshot))
}
