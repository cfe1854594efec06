//! Session administration routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::FullState;
use tracing::info;

use crate::routes::ws::session_error_to_status;
use crate::services::session::SessionInfo;
use crate::state::AppState;

/// `GET /sessions`: live sessions, sorted by id.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    Json(state.sessions.list().await)
}

/// `GET /sessions/{id}`: current canonical state of a live session.
/// Does not create the session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FullState>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    session.full_state().await.map(Json).map_err(|e| session_error_to_status(&e))
}

/// `DELETE /sessions/{id}`: stop the actor and drop its history. Connected
/// clients are disconnected.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.sessions.remove(&id).await {
        Ok(()) => {
            info!(session_id = %id, "http: session deleted");
            StatusCode::NO_CONTENT
        }
        Err(e) => session_error_to_status(&e),
    }
}
