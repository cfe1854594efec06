//! WebSocket handler: the SyncChannel between clients and session actors.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID, joins the session actor with a bounded
//! per-client channel, and enters a `select!` loop:
//! - Incoming client messages → decode + dispatch as intents to the actor
//! - `fullState` broadcasts from the actor → forward to client
//!
//! Intents never mutate anything here. Mutations happen inside the actor,
//! which answers every member (the sender included) through its channel, so
//! the sender sees its own change in the same order as everyone else.
//! Messages returned from [`process_inbound_text`] go to the sender only and
//! are limited to errors and snapshot acknowledgements.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join session → actor sends `fullState` at the current version
//! 2. Client sends intents → actor applies → `fullState` to all members
//! 3. Close → part session. The session and its history stay alive.
//! 4. Session torn down → member channel closes → socket closes

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::{ClientMessage, ErrorCode, ServerMessage, Stroke};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::session::{Intent, SessionError, SessionHandle};
use crate::services::snapshot::validate_name;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /ws`: join the default session.
pub async fn handle_ws_default(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let session_id = state.config.default_session.clone();
    upgrade(state, &session_id, ws).await
}

/// `GET /ws/{session_id}`: join (creating on first reference) a named session.
pub async fn handle_ws_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, &session_id, ws).await
}

async fn upgrade(state: AppState, session_id: &str, ws: WebSocketUpgrade) -> Response {
    let session = match state.sessions.get_or_create(session_id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(%session_id, error = %e, "ws: rejected upgrade");
            return (session_error_to_status(&e), e.to_string()).into_response();
        }
    };
    ws.on_upgrade(move |socket| run_ws(socket, state, session))
}

pub(crate) fn session_error_to_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidId(_) => StatusCode::BAD_REQUEST,
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Closed(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, session: SessionHandle) {
    let client_id = Uuid::new_v4();
    let session_id = session.id().to_owned();

    // Per-connection channel for state broadcasts from the session actor.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerMessage>(state.config.client_channel_capacity);

    if let Err(e) = session.join(client_id, client_tx).await {
        warn!(%client_id, %session_id, error = %e, "ws: join failed");
        if send_message(&mut socket, &ServerMessage::error_from(&e)).await.is_err() {
            info!(%client_id, "ws: client gone before join error was sent");
        }
        return;
    }
    info!(%client_id, %session_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, &session, client_id, text.as_str()).await;
                        if !send_all(&mut socket, &replies).await {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outbound = client_rx.recv() => {
                let Some(message) = outbound else {
                    info!(%client_id, %session_id, "ws: session closed, dropping client");
                    break;
                };
                if send_message(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }

    session.part(client_id).await;
    info!(%client_id, %session_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and dispatch one inbound text message. Returns messages for the
/// sender only; state changes reach the sender through the session broadcast.
pub(crate) async fn process_inbound_text(
    state: &AppState,
    session: &SessionHandle,
    client_id: Uuid,
    text: &str,
) -> Vec<ServerMessage> {
    let message = match frames::decode_client(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound message");
            return vec![ServerMessage::error_from(&e)];
        }
    };
    info!(%client_id, session_id = %session.id(), kind = message.kind(), "ws: recv");

    let result = match message {
        ClientMessage::SubmitStroke { points } => match Stroke::new(points) {
            Ok(stroke) => session.submit(Intent::Append(stroke)).await.map_err(|e| ServerMessage::error_from(&e)),
            Err(e) => {
                warn!(%client_id, error = %e, "ws: rejected stroke");
                Err(ServerMessage::error_from(&e))
            }
        },
        ClientMessage::Undo => submit(session, Intent::Undo).await,
        ClientMessage::Redo => submit(session, Intent::Redo).await,
        ClientMessage::Clear => submit(session, Intent::Clear).await,
        ClientMessage::RequestFullState => session.resync(client_id).await.map_err(|e| ServerMessage::error_from(&e)),
        ClientMessage::SaveSnapshot { name } => return vec![save_snapshot(state, session, &name).await],
        ClientMessage::LoadSnapshot { name } => load_snapshot(state, session, &name).await,
    };

    match result {
        Ok(()) => vec![],
        Err(reply) => vec![reply],
    }
}

async fn submit(session: &SessionHandle, intent: Intent) -> Result<(), ServerMessage> {
    session.submit(intent).await.map_err(|e| ServerMessage::error_from(&e))
}

/// Save the visible log. Runs outside the actor on an immutable copy.
async fn save_snapshot(state: &AppState, session: &SessionHandle, name: &str) -> ServerMessage {
    if let Err(e) = validate_name(name) {
        return ServerMessage::error_from(&e);
    }
    let visible = match session.visible().await {
        Ok(visible) => visible,
        Err(e) => return ServerMessage::error_from(&e),
    };
    match state.snapshots.save(name, &visible).await {
        Ok(()) => {
            info!(session_id = %session.id(), snapshot = %name, strokes = visible.len(), "ws: snapshot saved");
            ServerMessage::SnapshotSaved { name: name.to_owned(), strokes: visible.len() }
        }
        Err(e) => {
            error!(session_id = %session.id(), snapshot = %name, error = %e, "ws: snapshot save failed");
            ServerMessage::error_from(&e)
        }
    }
}

/// Load a snapshot and replace the session history. The new state is
/// broadcast by the actor.
async fn load_snapshot(state: &AppState, session: &SessionHandle, name: &str) -> Result<(), ServerMessage> {
    let log = state.snapshots.load(name).await.map_err(|e| {
        warn!(session_id = %session.id(), snapshot = %name, error = %e, "ws: snapshot load failed");
        ServerMessage::error_from(&e)
    })?;
    info!(session_id = %session.id(), snapshot = %name, strokes = log.len(), "ws: snapshot loaded");
    submit(session, Intent::Replace(log)).await
}

// =============================================================================
// SEND
// =============================================================================

async fn send_all(socket: &mut WebSocket, messages: &[ServerMessage]) -> bool {
    for message in messages {
        if send_message(socket, message).await.is_err() {
            return false;
        }
    }
    true
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let json = match frames::encode(message) {
        Ok(json) => json,
        Err(e) => {
            error!(code = e.error_code(), error = %e, "ws: failed to encode message");
            return Err(());
        }
    };
    if let ServerMessage::Error(payload) = message {
        warn!(code = %payload.code, message = %payload.message, "ws: send error");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
