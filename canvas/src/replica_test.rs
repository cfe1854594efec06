use frames::{FullState, Point, Stroke, StrokeError};

use super::*;
use crate::render::render;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y, "#ff0000", 4.0)
}

fn stroke(points: &[(f64, f64)]) -> Stroke {
    Stroke::new(points.iter().map(|&(x, y)| pt(x, y)).collect()).expect("valid stroke")
}

fn state(log: Vec<Stroke>, horizon: usize, version: u64) -> FullState {
    FullState { log, horizon, version }
}

// =============================================================
// Version guard
// =============================================================

#[test]
fn first_state_is_applied_even_at_version_zero() {
    let mut replica = Replica::new(10, 10);
    assert_eq!(replica.version(), None);
    assert_eq!(replica.apply(state(vec![], 0, 0)), ApplyOutcome::Applied { version: 0 });
    assert_eq!(replica.version(), Some(0));
}

#[test]
fn duplicate_version_is_stale() {
    let mut replica = Replica::new(10, 10);
    replica.apply(state(vec![stroke(&[(0.0, 0.0), (1.0, 1.0)])], 1, 3));
    let outcome = replica.apply(state(vec![], 0, 3));
    assert_eq!(outcome, ApplyOutcome::Stale { received: 3, current: 3 });
    assert_eq!(replica.visible().len(), 1);
}

#[test]
fn reordered_older_version_never_regresses_view() {
    let a = stroke(&[(0.0, 0.0), (1.0, 1.0)]);
    let b = stroke(&[(2.0, 2.0), (3.0, 3.0)]);
    let mut replica = Replica::new(10, 10);

    replica.apply(state(vec![a.clone(), b.clone()], 2, 5));
    let outcome = replica.apply(state(vec![a.clone()], 1, 4));

    assert!(matches!(outcome, ApplyOutcome::Stale { received: 4, current: 5 }));
    assert_eq!(replica.visible(), &[a, b]);
    assert_eq!(replica.version(), Some(5));
}

#[test]
fn increasing_versions_are_applied_in_turn() {
    let mut replica = Replica::new(10, 10);
    for v in [1, 2, 7, 8] {
        assert_eq!(replica.apply(state(vec![], 0, v)), ApplyOutcome::Applied { version: v });
    }
    assert_eq!(replica.version(), Some(8));
}

#[test]
fn visible_respects_server_horizon() {
    let a = stroke(&[(0.0, 0.0), (1.0, 1.0)]);
    let b = stroke(&[(2.0, 2.0), (3.0, 3.0)]);
    let mut replica = Replica::new(10, 10);
    replica.apply(state(vec![a.clone(), b], 1, 1));
    assert_eq!(replica.visible(), &[a]);
    assert_eq!(replica.state().log.len(), 2);
}

// =============================================================
// Frame cache
// =============================================================

#[test]
fn frame_matches_render_of_visible_slice() {
    let a = stroke(&[(1.0, 1.0), (8.0, 8.0)]);
    let b = stroke(&[(1.0, 8.0), (8.0, 1.0)]);
    let mut replica = Replica::new(10, 10);
    replica.apply(state(vec![a.clone(), b], 1, 1));
    assert_eq!(replica.frame(), &render(&[a], 10, 10));
}

#[test]
fn frame_is_cached_until_next_applied_update() {
    let mut replica = Replica::new(10, 10);
    replica.apply(state(vec![stroke(&[(1.0, 1.0), (8.0, 8.0)])], 1, 1));
    assert!(!replica.is_frame_cached());

    replica.frame();
    assert!(replica.is_frame_cached());

    replica.apply(state(vec![], 0, 1));
    assert!(replica.is_frame_cached(), "stale update must not invalidate the cache");

    replica.apply(state(vec![], 0, 2));
    assert!(!replica.is_frame_cached());
    assert_eq!(replica.frame().painted_pixels(), 0);
}

// =============================================================
// Gesture
// =============================================================

#[test]
fn preview_draws_gesture_over_committed_frame() {
    let mut replica = Replica::new(20, 20);
    replica.apply(state(vec![stroke(&[(2.0, 2.0), (2.0, 18.0)])], 1, 1));
    let committed = replica.frame().painted_pixels();

    replica.begin_gesture(pt(10.0, 2.0));
    assert_eq!(replica.preview().painted_pixels(), committed, "one point draws nothing");

    assert!(replica.extend_gesture(pt(10.0, 18.0)));
    let preview = replica.preview();
    assert!(preview.painted_pixels() > committed);
    assert_eq!(preview.pixel(10, 10), Some([255, 0, 0, 255]));

    // Preview never pollutes the cached frame.
    assert_eq!(replica.frame().painted_pixels(), committed);
}

#[test]
fn finish_gesture_returns_valid_stroke() {
    let mut replica = Replica::default();
    replica.begin_gesture(pt(0.0, 0.0));
    replica.extend_gesture(pt(5.0, 5.0));
    replica.extend_gesture(pt(9.0, 5.0));
    let stroke = replica.finish_gesture().expect("three points");
    assert_eq!(stroke.points().len(), 3);
    assert!(!replica.is_drawing());
}

#[test]
fn finish_single_point_gesture_is_rejected_locally() {
    let mut replica = Replica::default();
    replica.begin_gesture(pt(0.0, 0.0));
    assert_eq!(replica.finish_gesture(), Err(StrokeError::TooShort(1)));
    assert!(!replica.is_drawing());
}

#[test]
fn finish_without_gesture_is_too_short() {
    let mut replica = Replica::default();
    assert_eq!(replica.finish_gesture(), Err(StrokeError::TooShort(0)));
}

#[test]
fn extend_without_begin_is_ignored() {
    let mut replica = Replica::default();
    assert!(!replica.extend_gesture(pt(1.0, 1.0)));
    assert!(!replica.is_drawing());
}

#[test]
fn cancel_discards_gesture() {
    let mut replica = Replica::new(10, 10);
    replica.begin_gesture(pt(1.0, 1.0));
    replica.extend_gesture(pt(8.0, 8.0));
    replica.cancel_gesture();
    assert!(!replica.is_drawing());
    assert_eq!(replica.preview().painted_pixels(), 0);
}

#[test]
fn gesture_survives_remote_update() {
    let mut replica = Replica::new(10, 10);
    replica.begin_gesture(pt(1.0, 1.0));
    replica.apply(state(vec![stroke(&[(0.0, 9.0), (9.0, 9.0)])], 1, 4));
    replica.extend_gesture(pt(8.0, 1.0));
    assert_eq!(replica.finish_gesture().map(|s| s.points().len()), Ok(2));
}
