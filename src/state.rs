//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the session registry, the snapshot backend, and the parsed config.
//! Per-session state lives inside each session actor, never here.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::session::SessionRegistry;
use crate::services::snapshot::SnapshotStore;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; all inner fields are
/// Arc-wrapped or cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { sessions: SessionRegistry::new(config.session_queue_capacity), snapshots, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
