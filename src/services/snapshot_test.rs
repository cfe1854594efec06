use super::*;

fn stroke(x: f64, points: usize) -> Stroke {
    let pts = (0..points)
        .map(|i| Point::new(x, f64::from(u32::try_from(i).unwrap()) * 3.5, "#336699", 5.0))
        .collect();
    Stroke::new(pts).unwrap()
}

async fn file_store() -> (tempfile::TempDir, FileSnapshotStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::open(dir.path().join("drawings")).await.unwrap();
    (dir, store)
}

// =============================================================================
// Names
// =============================================================================

#[test]
fn valid_names() {
    for name in ["s1", "my-drawing", "board_2024.v2", "A", "x".repeat(MAX_NAME_LEN).as_str()] {
        assert!(is_valid_name(name), "{name} should be valid");
    }
}

#[test]
fn invalid_names() {
    let too_long = "x".repeat(MAX_NAME_LEN + 1);
    for name in ["", ".hidden", "../etc/passwd", "a/b", "a\\b", "sp ace", "ünï", too_long.as_str()] {
        assert!(!is_valid_name(name), "{name:?} should be invalid");
        assert!(matches!(validate_name(name), Err(SnapshotError::InvalidName(_))));
    }
}

#[test]
fn error_codes_and_retryable() {
    assert_eq!(SnapshotError::NotFound("x".into()).error_code(), "E_SNAPSHOT_NOT_FOUND");
    assert_eq!(SnapshotError::InvalidName("..".into()).error_code(), "E_INVALID_SNAPSHOT_NAME");
    let io = SnapshotError::Storage(std::io::Error::other("disk full"));
    assert_eq!(io.error_code(), "E_STORAGE");
    assert!(io.retryable());
    assert!(!SnapshotError::NotFound("x".into()).retryable());
}

// =============================================================================
// File store
// =============================================================================

#[tokio::test]
async fn file_save_then_load_returns_same_log() {
    let (_dir, store) = file_store().await;
    let log = vec![stroke(1.0, 3), stroke(2.0, 2)];
    store.save("s1", &log).await.unwrap();
    assert_eq!(store.load("s1").await.unwrap(), log);
}

#[tokio::test]
async fn file_save_empty_log() {
    let (_dir, store) = file_store().await;
    store.save("empty", &[]).await.unwrap();
    assert!(store.load("empty").await.unwrap().is_empty());
}

#[tokio::test]
async fn file_save_overwrites() {
    let (_dir, store) = file_store().await;
    store.save("s1", &[stroke(1.0, 2)]).await.unwrap();
    store.save("s1", &[stroke(7.0, 4), stroke(8.0, 2)]).await.unwrap();
    let loaded = store.load("s1").await.unwrap();
    assert_eq!(loaded, vec![stroke(7.0, 4), stroke(8.0, 2)]);
}

#[tokio::test]
async fn file_load_missing_is_not_found() {
    let (_dir, store) = file_store().await;
    assert!(matches!(store.load("nope").await, Err(SnapshotError::NotFound(name)) if name == "nope"));
}

#[tokio::test]
async fn file_rejects_traversal_names() {
    let (_dir, store) = file_store().await;
    assert!(matches!(store.save("../escape", &[]).await, Err(SnapshotError::InvalidName(_))));
    assert!(matches!(store.load("../escape").await, Err(SnapshotError::InvalidName(_))));
}

#[tokio::test]
async fn file_layout_is_point_arrays() {
    let (_dir, store) = file_store().await;
    store.save("layout", &[stroke(1.0, 2)]).await.unwrap();
    let raw = std::fs::read_to_string(store.dir().join("layout.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value[0].is_array());
    assert_eq!(value[0][0]["color"], "#336699");
    assert_eq!(value[0][0]["width"], 5.0);
}

#[tokio::test]
async fn file_load_skips_legacy_short_strokes() {
    let (_dir, store) = file_store().await;
    let legacy = r##"[
        [{"x":1,"y":1,"color":"#000","size":5}],
        [{"x":1,"y":1,"color":"#000","size":5},{"x":4,"y":4,"color":"#000","size":5}],
        []
    ]"##;
    std::fs::write(store.dir().join("legacy.json"), legacy).unwrap();
    let loaded = store.load("legacy").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].points().len(), 2);
}

#[tokio::test]
async fn file_load_corrupt_json() {
    let (_dir, store) = file_store().await;
    std::fs::write(store.dir().join("bad.json"), "{not json").unwrap();
    let err = store.load("bad").await.unwrap_err();
    assert_eq!(err.error_code(), "E_ENCODING");
}

#[tokio::test]
async fn file_list_is_sorted_and_ignores_strays() {
    let (_dir, store) = file_store().await;
    store.save("zeta", &[]).await.unwrap();
    store.save("alpha", &[]).await.unwrap();
    store.save("mid.v2", &[]).await.unwrap();
    std::fs::write(store.dir().join("notes.txt"), "x").unwrap();
    std::fs::write(store.dir().join(".partial.123.tmp"), "x").unwrap();
    assert_eq!(store.list().await.unwrap(), vec!["alpha", "mid.v2", "zeta"]);
}

#[tokio::test]
async fn file_save_leaves_no_temp_files() {
    let (_dir, store) = file_store().await;
    store.save("s1", &[stroke(1.0, 2)]).await.unwrap();
    let entries: Vec<String> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["s1.json"]);
}

#[tokio::test]
async fn file_failed_rename_removes_temp_file() {
    let (_dir, store) = file_store().await;
    // A non-empty directory at the target path makes the rename fail.
    std::fs::create_dir(store.dir().join("s1.json")).unwrap();
    std::fs::write(store.dir().join("s1.json").join("keep"), "x").unwrap();

    let err = store.save("s1", &[stroke(1.0, 2)]).await.unwrap_err();
    assert!(matches!(err, SnapshotError::Storage(_)));
    let entries: Vec<String> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["s1.json"]);
}

#[tokio::test]
async fn file_open_creates_nested_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = FileSnapshotStore::open(&nested).await.unwrap();
    assert!(store.dir().is_dir());
}

// =============================================================================
// Memory store
// =============================================================================

#[tokio::test]
async fn memory_save_load_list() {
    let store = MemorySnapshotStore::new();
    let log = vec![stroke(1.0, 2), stroke(2.0, 5)];
    store.save("b", &log).await.unwrap();
    store.save("a", &[]).await.unwrap();
    assert_eq!(store.load("b").await.unwrap(), log);
    assert!(store.load("a").await.unwrap().is_empty());
    assert_eq!(store.list().await.unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn memory_load_missing_and_invalid() {
    let store = MemorySnapshotStore::new();
    assert!(matches!(store.load("missing").await, Err(SnapshotError::NotFound(_))));
    assert!(matches!(store.save(".x", &[]).await, Err(SnapshotError::InvalidName(_))));
}

#[tokio::test]
async fn trait_object_dispatch() {
    let store: std::sync::Arc<dyn SnapshotStore> = std::sync::Arc::new(MemorySnapshotStore::new());
    store.save("s1", &[stroke(3.0, 2)]).await.unwrap();
    assert_eq!(store.load("s1").await.unwrap().len(), 1);
}
