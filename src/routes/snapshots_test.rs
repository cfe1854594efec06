use super::*;
use crate::state::test_helpers;
use frames::{Point, Stroke};

fn stroke(x: f64) -> Stroke {
    Stroke::new(vec![Point::new(x, 0.0, "#00ff00", 4.0), Point::new(x, 8.0, "#00ff00", 4.0)]).unwrap()
}

#[test]
fn snapshot_error_to_status_maps_each_variant() {
    assert_eq!(snapshot_error_to_status(&SnapshotError::InvalidName("..".into())), StatusCode::BAD_REQUEST);
    assert_eq!(snapshot_error_to_status(&SnapshotError::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(
        snapshot_error_to_status(&SnapshotError::Storage(std::io::Error::other("disk"))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn save_then_get_returns_log() {
    let state = test_helpers::test_app_state();
    let log = vec![stroke(1.0), stroke(2.0)];

    let Json(ack) = save_snapshot(State(state.clone()), Path("pic".into()), Json(SnapshotBody { log: log.clone() }))
        .await
        .unwrap();
    assert_eq!(ack, serde_json::json!({ "ok": true, "strokes": 2 }));

    let Json(body) = get_snapshot(State(state), Path("pic".into())).await.unwrap();
    assert_eq!(body.log, log);
}

#[tokio::test]
async fn get_missing_is_404() {
    let state = test_helpers::test_app_state();
    let err = get_snapshot(State(state), Path("nothing".into())).await.unwrap_err();
    assert_eq!(err, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_invalid_name_is_400() {
    let state = test_helpers::test_app_state();
    let err = save_snapshot(State(state), Path(".env".into()), Json(SnapshotBody::default())).await.unwrap_err();
    assert_eq!(err, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_is_sorted() {
    let state = test_helpers::test_app_state();
    state.snapshots.save("b", &[]).await.unwrap();
    state.snapshots.save("a", &[stroke(1.0)]).await.unwrap();
    let Json(listing) = list_snapshots(State(state)).await.unwrap();
    assert_eq!(listing, serde_json::json!({ "names": ["a", "b"] }));
}
