//! Shared stroke model and JSON wire protocol for realtime WS transport.
//!
//! This crate owns the wire representation used by the server, the `canvas`
//! replay crate, and the CLI. Messages are internally tagged JSON objects
//! (`{"type": "fullState", ...}`) carried in WebSocket text frames.

mod stroke;

use serde::{Deserialize, Serialize};

pub use stroke::{MIN_STROKE_POINTS, Point, Stroke, StrokeError};

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error messages.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Error returned by the decode helpers.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid message json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        "E_INVALID_MESSAGE"
    }
}

// =============================================================================
// CANONICAL STATE
// =============================================================================

/// The canonical `(log, horizon)` of one session, tagged with its version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullState {
    pub log: Vec<Stroke>,
    pub horizon: usize,
    pub version: u64,
}

impl FullState {
    /// Strokes currently shown: the `log[0..horizon)` prefix.
    #[must_use]
    pub fn visible(&self) -> &[Stroke] {
        &self.log[..self.horizon.min(self.log.len())]
    }
}

/// HTTP body for snapshot save/load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub log: Vec<Stroke>,
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Intents a client may send. Undo/redo never carry a target index: the
/// pointer is always computed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    SubmitStroke { points: Vec<Point> },
    Undo,
    Redo,
    Clear,
    RequestFullState,
    SaveSnapshot { name: String },
    LoadSnapshot { name: String },
}

impl ClientMessage {
    /// Wire name of the message, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubmitStroke { .. } => "submitStroke",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::RequestFullState => "requestFullState",
            Self::SaveSnapshot { .. } => "saveSnapshot",
            Self::LoadSnapshot { .. } => "loadSnapshot",
        }
    }
}

/// Structured error carried by [`ServerMessage::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

/// Messages the server sends to session members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    FullState(FullState),
    SnapshotSaved { name: String, strokes: usize },
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Create an error message from a plain code and message. Never retryable.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload { code: code.into(), message: message.into(), retryable: false })
    }

    /// Create a structured error message from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error(ErrorPayload {
            code: err.error_code().to_owned(),
            message: err.to_string(),
            retryable: err.retryable(),
        })
    }

    /// Version carried by a `fullState`, if this is one.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        match self {
            Self::FullState(state) => Some(state.version),
            Self::SnapshotSaved { .. } | Self::Error(_) => None,
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode any message as JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode<T: Serialize>(message: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a client intent from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed JSON, unknown message types, or
/// payloads of the wrong shape.
pub fn decode_client(text: &str) -> Result<ClientMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode a server message from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed JSON or invalid strokes.
pub fn decode_server(text: &str) -> Result<ServerMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
