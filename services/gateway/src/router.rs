//! Route table

use crate::handlers::{book, events, health, order, trades};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(order::place_order))
        .route("/orders/:id", get(order::get_order))
        .route("/orders/:id/cancel", post(order::cancel_order))
        .route("/orderbook", get(book::get_orderbook))
        .route("/trades", get(trades::get_trades))
        .route("/events/:channel", get(events::subscribe))
        .route("/healthz", get(health::healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
