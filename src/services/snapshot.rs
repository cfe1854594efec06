//! Snapshot service: named, durable copies of a session log.
//!
//! DESIGN
//! ======
//! A snapshot is just a log. The horizon is never stored: whoever loads a
//! snapshot makes it fully visible. Saving under an existing name overwrites
//! it (last write wins, no merge, no versioning).
//!
//! Two backends implement [`SnapshotStore`]:
//! - [`FileSnapshotStore`]: one `<name>.json` file per snapshot holding the log
//!   as `Point[][]`. Writes land in a temp file in the same directory, are
//!   synced to disk, then renamed into place, so readers never see a torn file.
//! - [`MemorySnapshotStore`]: process-local map, for tests and throwaway runs.
//!
//! ERROR HANDLING
//! ==============
//! Names are validated before any I/O. Legacy files may contain strokes with
//! fewer than two points (older clients saved every gesture); those strokes
//! are skipped with a warning instead of failing the whole load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use frames::{ErrorCode, Point, Stroke};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Longest accepted snapshot or session name.
pub const MAX_NAME_LEN: usize = 128;

const SNAPSHOT_EXT: &str = "json";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot name: {0:?}")]
    InvalidName(String),
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("snapshot storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("snapshot {name} is not valid json: {source}")]
    Corrupt { name: String, source: serde_json::Error },
}

impl ErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "E_INVALID_SNAPSHOT_NAME",
            Self::NotFound(_) => "E_SNAPSHOT_NOT_FOUND",
            Self::Storage(_) => "E_STORAGE",
            Self::Corrupt { .. } => "E_ENCODING",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Durable named storage for stroke logs.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store `log` under `name`, replacing any existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidName`] or a storage error.
    async fn save(&self, name: &str, log: &[Stroke]) -> Result<(), SnapshotError>;

    /// Fetch the log stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] when nothing is stored under `name`.
    async fn load(&self, name: &str) -> Result<Vec<Stroke>, SnapshotError>;

    /// Stored snapshot names, sorted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be listed.
    async fn list(&self) -> Result<Vec<String>, SnapshotError>;
}

// =============================================================================
// NAMES
// =============================================================================

/// Whether `name` is 1..=128 chars of `[A-Za-z0-9_.-]` not starting with `.`.
///
/// The same rule applies to session ids, and keeps every name a plain file
/// name with no path separators or traversal.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// # Errors
///
/// Returns [`SnapshotError::InvalidName`] when [`is_valid_name`] is false.
pub fn validate_name(name: &str) -> Result<(), SnapshotError> {
    if is_valid_name(name) { Ok(()) } else { Err(SnapshotError::InvalidName(name.to_owned())) }
}

/// Turn stored point arrays into strokes, skipping ones that would not be
/// committed today.
fn strokes_from_points(name: &str, raw: Vec<Vec<Point>>) -> Vec<Stroke> {
    let total = raw.len();
    let strokes: Vec<Stroke> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, points)| match Stroke::new(points) {
            Ok(stroke) => Some(stroke),
            Err(e) => {
                warn!(snapshot = %name, index, error = %e, "snapshot: skipping invalid stroke");
                None
            }
        })
        .collect();
    if strokes.len() != total {
        warn!(snapshot = %name, kept = strokes.len(), total, "snapshot: loaded with skipped strokes");
    }
    strokes
}

// =============================================================================
// FILE STORE
// =============================================================================

pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SNAPSHOT_EXT}"))
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, name: &str, log: &[Stroke]) -> Result<(), SnapshotError> {
        validate_name(name)?;
        let body = serde_json::to_vec(log).map_err(|source| SnapshotError::Corrupt { name: name.to_owned(), source })?;

        // Dot-prefixed temp names can never collide with a valid snapshot name.
        let tmp = self.dir.join(format!(".{name}.{}.tmp", Uuid::new_v4()));
        if let Err(e) = write_synced(&tmp, &body).await {
            remove_quietly(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(name)).await {
            remove_quietly(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Vec<Stroke>, SnapshotError> {
        validate_name(name)?;
        let bytes = match tokio::fs::read(self.path_for(name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(name.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        let raw: Vec<Vec<Point>> =
            serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Corrupt { name: name.to_owned(), source })?;
        Ok(strokes_from_points(name, raw))
    }

    async fn list(&self) -> Result<Vec<String>, SnapshotError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != SNAPSHOT_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if is_valid_name(stem) {
                names.push(stem.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Write and fsync, so the rename never publishes a file whose data is
/// still only in the page cache.
async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "snapshot: failed to remove temp file");
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, Vec<Stroke>>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, name: &str, log: &[Stroke]) -> Result<(), SnapshotError> {
        validate_name(name)?;
        self.snapshots.write().await.insert(name.to_owned(), log.to_vec());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Vec<Stroke>, SnapshotError> {
        validate_name(name)?;
        self.snapshots
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| SnapshotError::NotFound(name.to_owned()))
    }

    async fn list(&self) -> Result<Vec<String>, SnapshotError> {
        let mut names: Vec<String> = self.snapshots.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
