//! Client-side replica of one session's canonical state.
//!
//! The replica is purely reactive: it holds whatever `(log, horizon)` the
//! server last broadcast and never moves the horizon itself. Undo and redo
//! are requests sent to the server, not local state changes.
//!
//! ## Version guard
//!
//! [`Replica::apply`] accepts a `fullState` only when its version is strictly
//! greater than the last one applied. Duplicates and reordered deliveries are
//! reported as [`ApplyOutcome::Stale`] and leave the replica untouched.
//!
//! ## Frame cache
//!
//! The rendered visible history is cached and only rebuilt after an applied
//! update. Live preview copies the cached frame and draws the in-progress
//! gesture on top, so each input event costs one polyline instead of a full
//! replay.

use frames::{FullState, Point, Stroke, StrokeError};

use crate::render::{self, PixelBuffer};

/// Result of offering a server state to the replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { version: u64 },
    /// Version not strictly greater than the last applied one. Ignored.
    Stale { received: u64, current: u64 },
}

#[derive(Debug, Clone)]
pub struct Replica {
    width: u32,
    height: u32,
    state: FullState,
    applied_version: Option<u64>,
    frame: Option<PixelBuffer>,
    gesture: Option<Vec<Point>>,
}

impl Replica {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, state: FullState::default(), applied_version: None, frame: None, gesture: None }
    }

    // --- Canonical state ---

    /// Offer a server broadcast. The first state is always applied.
    pub fn apply(&mut self, state: FullState) -> ApplyOutcome {
        if let Some(current) = self.applied_version {
            if state.version <= current {
                return ApplyOutcome::Stale { received: state.version, current };
            }
        }
        let version = state.version;
        self.state = state;
        self.applied_version = Some(version);
        self.frame = None;
        ApplyOutcome::Applied { version }
    }

    /// Version of the last applied state, `None` before the first one.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.applied_version
    }

    #[must_use]
    pub fn state(&self) -> &FullState {
        &self.state
    }

    #[must_use]
    pub fn visible(&self) -> &[Stroke] {
        self.state.visible()
    }

    #[must_use]
    pub fn is_frame_cached(&self) -> bool {
        self.frame.is_some()
    }

    /// Committed frame: `render(visible)`, rebuilt only after an update.
    pub fn frame(&mut self) -> &PixelBuffer {
        let (state, width, height) = (&self.state, self.width, self.height);
        self.frame.get_or_insert_with(|| render::render(state.visible(), width, height))
    }

    // --- Local gesture ---

    /// Start a new gesture, discarding any unfinished one.
    pub fn begin_gesture(&mut self, point: Point) {
        self.gesture = Some(vec![point]);
    }

    /// Append a point to the gesture. Returns `false` when none is active.
    pub fn extend_gesture(&mut self, point: Point) -> bool {
        match self.gesture.as_mut() {
            Some(points) => {
                points.push(point);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Committed frame with the in-progress gesture drawn on top.
    pub fn preview(&mut self) -> PixelBuffer {
        let mut buf = self.frame().clone();
        if let Some(points) = &self.gesture {
            render::draw_points(&mut buf, points);
        }
        buf
    }

    /// End the gesture and turn it into a stroke ready to submit.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::TooShort`] when fewer than two points were
    /// captured (or no gesture was active), and a point-level error for
    /// invalid coordinates or widths. The gesture is consumed either way.
    pub fn finish_gesture(&mut self) -> Result<Stroke, StrokeError> {
        Stroke::new(self.gesture.take().unwrap_or_default())
    }

    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }
}

impl Default for Replica {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_WIDTH, crate::consts::DEFAULT_HEIGHT)
    }
}

#[cfg(test)]
#[path = "replica_test.rs"]
mod replica_test;
