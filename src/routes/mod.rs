//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the WebSocket sync endpoints, the snapshot HTTP surface, and the
//! session admin routes under a single Axum router.

pub mod sessions;
pub mod snapshots;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws_default))
        .route("/ws/{session_id}", get(ws::handle_ws_session))
        .route("/snapshots", get(snapshots::list_snapshots))
        .route("/snapshots/{name}", get(snapshots::get_snapshot).post(snapshots::save_snapshot))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{id}", get(sessions::get_session).delete(sessions::delete_session))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
