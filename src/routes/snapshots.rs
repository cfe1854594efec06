//! Snapshot HTTP routes.
//!
//! Thin adapters over [`SnapshotStore`](crate::services::snapshot::SnapshotStore).
//! Bodies use the same `{log}` shape as the WebSocket `fullState` payload, so
//! a client can post back exactly what it was shown.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::SnapshotBody;
use tracing::{error, info, warn};

use crate::services::snapshot::SnapshotError;
use crate::state::AppState;

/// `POST /snapshots/{name}`: persist a log under `name`.
pub async fn save_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SnapshotBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let strokes = body.log.len();
    state.snapshots.save(&name, &body.log).await.map_err(|e| {
        log_failure(&name, &e);
        snapshot_error_to_status(&e)
    })?;
    info!(snapshot = %name, strokes, "http: snapshot saved");
    Ok(Json(serde_json::json!({ "ok": true, "strokes": strokes })))
}

/// `GET /snapshots/{name}`: fetch a stored log.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SnapshotBody>, StatusCode> {
    let log = state.snapshots.load(&name).await.map_err(|e| {
        log_failure(&name, &e);
        snapshot_error_to_status(&e)
    })?;
    Ok(Json(SnapshotBody { log }))
}

/// `GET /snapshots`: sorted snapshot names.
pub async fn list_snapshots(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let names = state.snapshots.list().await.map_err(|e| {
        error!(error = %e, "http: snapshot list failed");
        snapshot_error_to_status(&e)
    })?;
    Ok(Json(serde_json::json!({ "names": names })))
}

fn log_failure(name: &str, err: &SnapshotError) {
    match err {
        SnapshotError::Storage(_) | SnapshotError::Corrupt { .. } => {
            error!(snapshot = %name, error = %err, "http: snapshot storage failure");
        }
        SnapshotError::InvalidName(_) | SnapshotError::NotFound(_) => {
            warn!(snapshot = %name, error = %err, "http: snapshot request rejected");
        }
    }
}

pub(crate) fn snapshot_error_to_status(err: &SnapshotError) -> StatusCode {
    match err {
        SnapshotError::InvalidName(_) => StatusCode::BAD_REQUEST,
        SnapshotError::NotFound(_) => StatusCode::NOT_FOUND,
        SnapshotError::Storage(_) | SnapshotError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "snapshots_test.rs"]
mod tests;
