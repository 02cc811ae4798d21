//! Keyed snapshot persistence.
//!
//! Each match reads and writes only its own key, so concurrent matches
//! never overwrite one another.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use broadside_protocol::MatchId;
use tokio::sync::Mutex;

use crate::{MatchState, StoreError};

/// Durable storage for [`MatchState`] snapshots, keyed by match.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Replaces the snapshot for `state.match_id`.
    async fn save(&self, state: &MatchState) -> Result<(), StoreError>;

    /// The last saved snapshot, or `None` if there isn't one.
    async fn load(&self, match_id: MatchId) -> Result<Option<MatchState>, StoreError>;

    /// Deletes the snapshot. Removing a missing key is not an error.
    async fn remove(&self, match_id: MatchId) -> Result<(), StoreError>;
}

/// Keeps snapshots in memory as their serialized JSON.
///
/// Storing the encoded form means a load goes through the same decoding
/// path as a file-backed store would.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<MatchId, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots currently held.
    pub async fn len(&self) -> usize {
        self.snapshots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.lock().await.is_empty()
    }

    /// The raw encoded snapshot, for byte-level comparisons.
    pub async fn raw(&self, match_id: MatchId) -> Option<String> {
        self.snapshots.lock().await.get(&match_id).cloned()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, state: &MatchState) -> Result<(), StoreError> {
        let json = state.to_json()?;
        self.snapshots.lock().await.insert(state.match_id, json);
        Ok(())
    }

    async fn load(&self, match_id: MatchId) -> Result<Option<MatchState>, StoreError> {
        match self.snapshots.lock().await.get(&match_id) {
            Some(json) => MatchState::from_json(json).map(Some),
            None => Ok(None),
        }
    }

    async fn remove(&self, match_id: MatchId) -> Result<(), StoreError> {
        self.snapshots.lock().await.remove(&match_id);
        Ok(())
    }
}

/// One JSON file per match, `match-{id}.json`, in a directory.
///
/// Writes go to a temporary file that is then renamed over the old one,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Uses `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the snapshot for `match_id` lives.
    pub fn path_for(&self, match_id: MatchId) -> PathBuf {
        self.dir.join(format!("match-{}.json", match_id.0))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, state: &MatchState) -> Result<(), StoreError> {
        let json = state.to_json()?;
        let path = self.path_for(state.match_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, match_id: MatchId) -> Result<Option<MatchState>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(match_id)).await {
            Ok(json) => MatchState::from_json(&json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, match_id: MatchId) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(match_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use broadside_protocol::PlayerId;

    static NEXT_DIR: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "broadside_store_{}_{id}",
            std::process::id()
        ))
    }

    fn state(id: u64) -> MatchState {
        MatchState::new(MatchId(id), [PlayerId(1), PlayerId(2)], 10).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_save_load_remove() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load(MatchId(1)).await.unwrap(), None);

        store.save(&state(1)).await.unwrap();
        assert_eq!(store.load(MatchId(1)).await.unwrap(), Some(state(1)));

        store.remove(MatchId(1)).await.unwrap();
        store.remove(MatchId(1)).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_keys_do_not_clobber() {
        let store = MemorySnapshotStore::new();
        let mut second = state(2);
        second.timeout_counts = [1, 0];

        store.save(&state(1)).await.unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.load(MatchId(1)).await.unwrap(), Some(state(1)));
        assert_eq!(store.load(MatchId(2)).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_file_store_round_trips_and_overwrites() {
        let dir = temp_dir();
        let store = FileSnapshotStore::open(&dir).await.unwrap();

        store.save(&state(5)).await.unwrap();
        assert!(store.path_for(MatchId(5)).ends_with("match-5.json"));

        let mut later = state(5);
        later.current_turn = crate::Seat::Two;
        store.save(&later).await.unwrap();
        assert_eq!(store.load(MatchId(5)).await.unwrap(), Some(later));

        store.remove(MatchId(5)).await.unwrap();
        assert_eq!(store.load(MatchId(5)).await.unwrap(), None);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_file_store_remove_missing_is_ok() {
        let dir = temp_dir();
        let store = FileSnapshotStore::open(&dir).await.unwrap();
        assert!(store.remove(MatchId(99)).await.is_ok());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_file_store_load_corrupt_file_is_decode_error() {
        let dir = temp_dir();
        let store = FileSnapshotStore::open(&dir).await.unwrap();
        std::fs::write(store.path_for(MatchId(3)), b"garbage").unwrap();

        assert!(matches!(
            store.load(MatchId(3)).await,
            Err(StoreError::Decode(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }
}
