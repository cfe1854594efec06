//! History: the canonical per-session stroke log and undo/redo pointer.
//!
//! DESIGN
//! ======
//! Undo is a single integer `horizon` over an append-only `log`. Strokes in
//! `log[..horizon]` are visible; strokes in `log[horizon..]` are hidden but
//! kept so redo can bring them back. The next append discards them.
//!
//! The invariants `horizon <= log.len()` and "visible is a prefix" hold by
//! construction: every operation clamps instead of failing. Validation of
//! incoming points happens before a [`Stroke`] exists, so nothing here can
//! reject an append.
//!
//! This type is synchronous and owned by exactly one session actor, which is
//! what serializes mutations.

use frames::{FullState, Stroke};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    log: Vec<Stroke>,
    horizon: usize,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fully visible history from a stored log.
    #[must_use]
    pub fn from_log(log: Vec<Stroke>) -> Self {
        let horizon = log.len();
        Self { log, horizon }
    }

    /// Commit a stroke, discarding the redo branch first.
    pub fn append(&mut self, stroke: Stroke) {
        self.log.truncate(self.horizon);
        self.log.push(stroke);
        self.horizon = self.log.len();
    }

    /// Hide the last visible stroke. No-op at zero.
    pub fn undo(&mut self) {
        self.horizon = self.horizon.saturating_sub(1);
    }

    /// Reveal the next hidden stroke. No-op when nothing is hidden.
    pub fn redo(&mut self) {
        self.horizon = (self.horizon + 1).min(self.log.len());
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.horizon = 0;
    }

    /// Replace the whole history with a loaded log, fully visible.
    pub fn replace(&mut self, log: Vec<Stroke>) {
        *self = Self::from_log(log);
    }

    #[must_use]
    pub fn visible(&self) -> &[Stroke] {
        &self.log[..self.horizon]
    }

    #[must_use]
    pub fn log(&self) -> &[Stroke] {
        &self.log
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of hidden, redo-eligible strokes.
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.log.len() - self.horizon
    }

    /// Immutable copy of `(log, horizon)` tagged with `version`.
    #[must_use]
    pub fn full_state(&self, version: u64) -> FullState {
        FullState { log: self.log.clone(), horizon: self.horizon, version }
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
