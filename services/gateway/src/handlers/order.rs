//! Order placement, cancellation and lookup

use crate::error::AppError;
use crate::models::{OrderResponse, PlaceOrderRequest};
use crate::state::{AppState, PLACEMENT_RATE_CAPACITY, PLACEMENT_RATE_REFILL};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use matching_engine::EnqueueError;
use persistence::StoreError;
use tracing::{info, warn};
use types::ids::OrderId;
use types::time::unix_nanos_now;
use uuid::Uuid;

/// POST /orders
///
/// Validates, applies the idempotency short-circuit, persists the
/// order as open, then enqueues it for matching. The response is the
/// durable record; matching happens asynchronously.
pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    state.rate_limiter.check_rate_limit(
        &format!("{}:order_placement", request.client_id),
        PLACEMENT_RATE_CAPACITY,
        PLACEMENT_RATE_REFILL,
    )?;

    let errors = request.validate();
    if !errors.is_empty() {
        warn!(client_id = %request.client_id, ?errors, "order validation failed");
        return Err(AppError::Validation(errors));
    }

    // Idempotent replay: an already-bound key returns the existing
    // order with no second enqueue and no re-matching.
    if let Some(key) = request
        .idempotency_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
    {
        if let Some(existing) = state.store.find_by_idempotency(key)? {
            info!(
                idempotency_key = key,
                order_id = %existing.order_id,
                "idempotent replay, returning existing order"
            );
            return Ok((StatusCode::CREATED, Json(OrderResponse::from(&existing))));
        }
    }

    let order = request.into_order(unix_nanos_now());
    match state.store.insert_order(&order) {
        Ok(()) => {}
        // Lost a race on the unique key; the winner's row is the answer
        Err(StoreError::DuplicateIdempotencyKey { key }) => {
            if let Some(existing) = state.store.find_by_idempotency(&key)? {
                return Ok((StatusCode::CREATED, Json(OrderResponse::from(&existing))));
            }
            return Err(AppError::StoreUnavailable(
                "idempotency key bound but order not found".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        order_id = %order.order_id,
        client_id = %order.client_id,
        instrument = %order.instrument,
        side = ?order.side,
        kind = ?order.kind,
        quantity = %order.quantity,
        "order received"
    );

    state.engine.enqueue_place(order.clone())?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// POST /orders/:id/cancel
///
/// Cancelling a terminal-state order is a no-op that returns the
/// order's current state; the queue ordering makes any other answer
/// racy anyway.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order_id = OrderId::from_uuid(order_id);
    let Some(order) = state.store.find_by_id(order_id)? else {
        return Err(AppError::NotFound(format!("Order not found: {order_id}")));
    };

    if !order.status.is_live() {
        info!(order_id = %order_id, status = ?order.status, "cancel of terminal order is a no-op");
        return Ok(Json(OrderResponse::from(&order)));
    }

    match state.engine.enqueue_cancel(order_id) {
        Ok(()) => {
            info!(order_id = %order_id, "cancel command enqueued");
        }
        Err(EnqueueError::QueueFull) => return Err(AppError::QueueFull),
        Err(e) => return Err(e.into()),
    }

    // Status is updated by the worker; return the current record
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order_id = OrderId::from_uuid(order_id);
    match state.store.find_by_id(order_id)? {
        Some(order) => Ok(Json(OrderResponse::from(&order))),
        None => Err(AppError::NotFound(format!("Order not found: {order_id}"))),
    }
}
