//! Health probe

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /healthz
///
/// Reports store and queue health; any DOWN component yields 503.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = state.store.ping().is_ok();
    let queue_up = state.engine.is_running();
    let status = if database_up && queue_up { "UP" } else { "DOWN" };

    let body = Json(json!({
        "status": status,
        "database": if database_up { "UP" } else { "DOWN" },
        "queue": if queue_up { "UP" } else { "DOWN" },
        "queue_depth": state.engine.queue_depth(),
    }));

    if status == "UP" {
        (StatusCode::OK, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body)
    }
}
