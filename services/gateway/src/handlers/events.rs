//! Event streaming over SSE
//!
//! One endpoint per channel family: `/events/trades`,
//! `/events/orderbook`, `/events/orders`. Each subscriber gets a
//! broadcast receiver bridged into an SSE body; a subscriber that
//! lags simply skips the messages it missed, and disconnects drop
//! the receiver.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use tokio::sync::broadcast;
use tracing::debug;

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// GET /events/:channel
pub async fn subscribe(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Sse<EventStream>, AppError> {
    let stream = match channel.as_str() {
        "trades" => event_stream(state.events.subscribe_trades(), "trade"),
        "orderbook" => event_stream(state.events.subscribe_book_deltas(), "orderbook_delta"),
        "orders" => event_stream(state.events.subscribe_orders(), "order_state_change"),
        other => {
            return Err(AppError::NotFound(format!(
                "Unknown event channel: {other}"
            )))
        }
    };
    debug!(channel, "event stream subscribed");
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Bridge a broadcast receiver into an SSE stream. Lagged receivers
/// skip ahead silently; a closed bus ends the stream.
fn event_stream<T>(rx: broadcast::Receiver<T>, name: &'static str) -> EventStream
where
    T: Serialize + Clone + Send + 'static,
{
    Box::pin(futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Ok(data) = serde_json::to_string(&event) else {
                        continue;
                    };
                    return Some((Ok(Event::default().event(name).data(data)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "event subscriber lagged, skipping ahead");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }))
}
