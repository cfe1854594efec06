//! Session service: one actor per drawing session.
//!
//! ARCHITECTURE
//! ============
//! Every session is a Tokio task ([`SessionActor`]) that exclusively owns its
//! [`History`], version counter, and member channels. All access goes through
//! a bounded `mpsc` queue of [`SessionCommand`]s, so intents from racing
//! clients are applied strictly in arrival order and no lock is ever held
//! across a mutation. [`SessionHandle`] is the cloneable sender side.
//!
//! VERSIONING
//! ==========
//! A new session starts at version 0. Every applied intent (append, undo,
//! redo, clear, replace) bumps the version by one, including clamped no-ops,
//! and broadcasts `fullState` to every member including the sender. Joining
//! and resync requests send the current state to that member only without a
//! bump. Because the actor is the only writer to member channels, each member
//! sees versions in order.
//!
//! FAN-OUT
//! =======
//! Broadcast is `try_send` per member: never blocks the queue, at most once.
//! A full channel drops that one message for that member; a closed channel
//! removes the member. Members recover with `requestFullState`.
//!
//! LIFECYCLE
//! =========
//! [`SessionRegistry`] spawns the actor on first reference to a session id.
//! Sessions outlive their members and end only on explicit teardown or
//! process shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use frames::{ErrorCode, FullState, ServerMessage, Stroke};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::history::History;
use super::snapshot::is_valid_name;

// =============================================================================
// TYPES
// =============================================================================

/// Outbound channel of one connected member.
pub type MemberTx = mpsc::Sender<ServerMessage>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session id: {0:?}")]
    InvalidId(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session {0} is closed")]
    Closed(String),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "E_INVALID_SESSION_ID",
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::Closed(_) => "E_SESSION_CLOSED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// A state-changing request against a session's history.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Append(Stroke),
    Undo,
    Redo,
    Clear,
    /// Wholesale replacement by a loaded snapshot, fully visible.
    Replace(Vec<Stroke>),
}

impl Intent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::Replace(_) => "replace",
        }
    }
}

/// Messages accepted by a session actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// Register a member and send it the current state.
    Join { member: Uuid, tx: MemberTx },
    Part { member: Uuid },
    /// Apply an intent and broadcast. `reply` receives the new version.
    Apply { intent: Intent, reply: Option<oneshot::Sender<u64>> },
    /// Send the current state to one member only.
    Resync { member: Uuid },
    /// Immutable copy of the current state.
    Snapshot { reply: oneshot::Sender<FullState> },
    /// Copy of the visible prefix only, for snapshot saves.
    Visible { reply: oneshot::Sender<Vec<Stroke>> },
    Info { reply: oneshot::Sender<SessionInfo> },
    Shutdown,
}

/// Summary of a live session, for listings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub version: u64,
    pub members: usize,
    pub strokes: usize,
    pub horizon: usize,
}

// =============================================================================
// ACTOR
// =============================================================================

pub struct SessionActor {
    id: String,
    history: History,
    version: u64,
    members: HashMap<Uuid, MemberTx>,
    rx: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    #[must_use]
    pub fn new(id: String, rx: mpsc::Receiver<SessionCommand>) -> Self {
        Self { id, history: History::new(), version: 0, members: HashMap::new(), rx }
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(session_id = %self.id, "session: started");
        while let Some(command) = self.rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        info!(
            session_id = %self.id,
            version = self.version,
            members = self.members.len(),
            "session: stopped"
        );
    }

    /// Apply one command. Returns `false` to stop the actor.
    fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Join { member, tx } => {
                self.members.insert(member, tx);
                info!(
                    session_id = %self.id,
                    %member,
                    members = self.members.len(),
                    "session: member joined"
                );
                self.send_state_to(member);
            }
            SessionCommand::Part { member } => {
                if self.members.remove(&member).is_some() {
                    info!(
                        session_id = %self.id,
                        %member,
                        members = self.members.len(),
                        "session: member parted"
                    );
                }
            }
            SessionCommand::Apply { intent, reply } => {
                let version = self.apply(intent);
                if let Some(reply) = reply {
                    // Caller may have given up waiting; the intent is applied regardless.
                    if reply.send(version).is_err() {
                        warn!(session_id = %self.id, version, "session: apply caller went away");
                    }
                }
            }
            SessionCommand::Resync { member } => self.send_state_to(member),
            SessionCommand::Snapshot { reply } => {
                if reply.send(self.history.full_state(self.version)).is_err() {
                    warn!(session_id = %self.id, "session: snapshot caller went away");
                }
            }
            SessionCommand::Visible { reply } => {
                if reply.send(self.history.visible().to_vec()).is_err() {
                    warn!(session_id = %self.id, "session: visible caller went away");
                }
            }
            SessionCommand::Info { reply } => {
                if reply.send(self.info()).is_err() {
                    warn!(session_id = %self.id, "session: info caller went away");
                }
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    fn apply(&mut self, intent: Intent) -> u64 {
        let kind = intent.kind();
        match intent {
            Intent::Append(stroke) => self.history.append(stroke),
            Intent::Undo => self.history.undo(),
            Intent::Redo => self.history.redo(),
            Intent::Clear => self.history.clear(),
            Intent::Replace(log) => self.history.replace(log),
        }
        self.version += 1;
        debug!(
            session_id = %self.id,
            intent = kind,
            version = self.version,
            strokes = self.history.log().len(),
            horizon = self.history.horizon(),
            hidden = self.history.hidden(),
            "session: applied"
        );
        self.broadcast();
        self.version
    }

    fn send_state_to(&mut self, member: Uuid) {
        let Some(tx) = self.members.get(&member) else {
            warn!(session_id = %self.id, %member, "session: resync for unknown member");
            return;
        };
        let message = ServerMessage::FullState(self.history.full_state(self.version));
        match tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    session_id = %self.id,
                    %member,
                    version = self.version,
                    "session: member channel full, state dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.members.remove(&member);
                info!(session_id = %self.id, %member, "session: removed closed member");
            }
        }
    }

    fn broadcast(&mut self) {
        let message = ServerMessage::FullState(self.history.full_state(self.version));
        let mut closed = Vec::new();
        for (member, tx) in &self.members {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        session_id = %self.id,
                        %member,
                        version = self.version,
                        "session: member channel full, broadcast dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*member),
            }
        }
        for member in closed {
            self.members.remove(&member);
            info!(session_id = %self.id, %member, "session: removed closed member");
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            version: self.version,
            members: self.members.len(),
            strokes: self.history.log().len(),
            horizon: self.history.horizon(),
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable sender side of a session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Arc<str>,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Spawn a new actor for `id` with a command queue of `capacity`.
    #[must_use]
    pub fn spawn(id: &str, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(SessionActor::new(id.to_owned(), rx).run());
        (Self { id: Arc::from(id), tx }, task)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| SessionError::Closed(self.id.to_string()))
    }

    /// Register `member`; the actor sends it the current `fullState`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn join(&self, member: Uuid, tx: MemberTx) -> Result<(), SessionError> {
        self.send(SessionCommand::Join { member, tx }).await
    }

    /// Unregister `member`. A stopped session has no members to remove.
    pub async fn part(&self, member: Uuid) {
        if self.send(SessionCommand::Part { member }).await.is_err() {
            info!(session_id = %self.id, %member, "session: part after close");
        }
    }

    /// Queue an intent without waiting for it to be applied.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn submit(&self, intent: Intent) -> Result<(), SessionError> {
        self.send(SessionCommand::Apply { intent, reply: None }).await
    }

    /// Apply an intent and wait for the resulting version.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    #[cfg(test)]
    pub async fn apply(&self, intent: Intent) -> Result<u64, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Apply { intent, reply: Some(reply) }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id.to_string()))
    }

    /// Ask the actor to send the current state to `member` only.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn resync(&self, member: Uuid) -> Result<(), SessionError> {
        self.send(SessionCommand::Resync { member }).await
    }

    /// Immutable copy of `(log, horizon, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn full_state(&self) -> Result<FullState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id.to_string()))
    }

    /// Immutable copy of the visible strokes, `log[0..horizon)`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn visible(&self) -> Result<Vec<Stroke>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Visible { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the actor has stopped.
    pub async fn info(&self) -> Result<SessionInfo, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Info { reply }).await?;
        rx.await.map_err(|_| SessionError::Closed(self.id.to_string()))
    }

    /// Ask the actor to stop after the commands already queued.
    pub async fn shutdown(&self) {
        if self.send(SessionCommand::Shutdown).await.is_err() {
            info!(session_id = %self.id, "session: already stopped");
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

struct SessionEntry {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

/// Live sessions by id. Creates actors on first reference.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    queue_capacity: usize,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), queue_capacity }
    }

    /// Handle for `id`, spawning the session if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidId`] for ids outside `[A-Za-z0-9_.-]`.
    pub async fn get_or_create(&self, id: &str) -> Result<SessionHandle, SessionError> {
        if !is_valid_name(id) {
            return Err(SessionError::InvalidId(id.to_owned()));
        }
        if let Some(entry) = self.sessions.read().await.get(id) {
            if !entry.handle.is_closed() {
                return Ok(entry.handle.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another task may have created it between the locks.
        if let Some(entry) = sessions.get(id) {
            if !entry.handle.is_closed() {
                return Ok(entry.handle.clone());
            }
        }
        let (handle, task) = SessionHandle::spawn(id, self.queue_capacity);
        sessions.insert(id.to_owned(), SessionEntry { handle: handle.clone(), task });
        info!(session_id = %id, sessions = sessions.len(), "session: created");
        Ok(handle)
    }

    /// Handle for an existing session.
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(|entry| entry.handle.clone())
    }

    /// Live session ids, sorted.
    #[cfg(test)]
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Summaries of every live session, sorted by id.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().map(|e| e.handle.clone()).collect();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.info().await {
                Ok(info) => infos.push(info),
                Err(e) => warn!(session_id = %handle.id(), error = %e, "session: info unavailable"),
            }
        }
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Stop and forget a session. Its members' channels close.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if no such session is live.
    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        let entry = self.sessions.write().await.remove(id).ok_or_else(|| SessionError::NotFound(id.to_owned()))?;
        stop(entry).await;
        info!(session_id = %id, "session: torn down");
        Ok(())
    }

    /// Stop every session and wait for the actors to finish.
    pub async fn shutdown_all(&self) {
        let entries: Vec<SessionEntry> = self.sessions.write().await.drain().map(|(_, entry)| entry).collect();
        let count = entries.len();
        futures::future::join_all(entries.into_iter().map(stop)).await;
        info!(sessions = count, "session: all sessions stopped");
    }
}

async fn stop(entry: SessionEntry) {
    entry.handle.shutdown().await;
    if let Err(e) = entry.task.await {
        warn!(session_id = %entry.handle.id(), error = %e, "session: actor task failed");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
