/// JSON snapshot persistence for the download queue.
///
/// The whole `QueueState` is read and written at once. Writes go to a sibling
/// temp file that is then renamed over the snapshot, so a crash mid-write
/// leaves the previous snapshot intact.
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::errors::StoreError;
use crate::models::{QueueState, WorkItem};

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, distinguishing "absent" from "unreadable".
    pub fn try_load(&self) -> Result<Option<QueueState>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let state = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(Some(state))
    }

    /// Load the snapshot, falling back to an empty state when it is missing
    /// or cannot be used.
    pub fn load(&self) -> QueueState {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(
                    "Loaded queue from {:?}: {} pending, {} failed",
                    self.path,
                    state.pending.len(),
                    state.failed.len()
                );
                state
            }
            Ok(None) => {
                debug!("No snapshot at {:?}, starting empty", self.path);
                QueueState::default()
            }
            Err(e) => {
                warn!("{} (starting with an empty queue)", e);
                QueueState::default()
            }
        }
    }

    /// Overwrite the snapshot with `state`.
    pub fn save(&self, state: &QueueState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.temp_path();
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, &json).map_err(write_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_err(e));
        }
        debug!("Saved queue snapshot to {:?} ({} bytes)", self.path, json.len());
        Ok(())
    }

    /// Save and report failure without propagating it.
    ///
    /// Returns false when the write failed.
    pub fn persist(&self, state: &QueueState) -> bool {
        match self.save(state) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist queue: {}", e);
                false
            }
        }
    }

    /// Append `item` to the pending queue and persist.
    pub fn enqueue(&self, state: &mut QueueState, item: WorkItem) -> bool {
        info!("Queued {} ({})", item.target, item.format_selector);
        state.pending.push(item);
        self.persist(state)
    }

    /// Record an item that failed outside the queue and persist.
    pub fn record_failure(&self, state: &mut QueueState, item: WorkItem) -> bool {
        state.failed.push(item);
        self.persist(state)
    }

    /// Change the default destination and persist.
    pub fn set_default_destination(&self, state: &mut QueueState, destination: Option<String>) -> bool {
        state.default_destination = destination.filter(|d| !d.trim().is_empty());
        self.persist(state)
    }

    /// Move every failed item to the tail of the pending queue and persist.
    ///
    /// Returns how many items were requeued.
    pub fn requeue_failed(&self, state: &mut QueueState) -> usize {
        let moved = state.failed.len();
        if moved > 0 {
            let failed = std::mem::take(&mut state.failed);
            state.pending.extend(failed);
            self.persist(state);
            info!("Requeued {} failed downloads", moved);
        }
        moved
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "queue".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (QueueStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (QueueStore::new(dir.path().join("YTGet_Conf.json")), dir)
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let (store, _dir) = store();
        assert_eq!(store.try_load().unwrap(), None);
        assert_eq!(store.load(), QueueState::default());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_empty() {
        let (store, _dir) = store();
        std::fs::write(store.path(), b"{ not json").unwrap();
        assert!(matches!(store.try_load(), Err(StoreError::Corrupt { .. })));
        assert_eq!(store.load(), QueueState::default());
    }

    #[test]
    fn test_save_then_load_is_equivalent() {
        let (store, _dir) = store();
        let state = QueueState {
            default_destination: Some("/media".into()),
            pending: vec![WorkItem::new("V1", "22", "/out"), WorkItem::new("V2", "18", "/out")],
            failed: vec![WorkItem::new("V3", "bestaudio/best", "/elsewhere")],
        };
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_enqueue_persists_in_order() {
        let (store, _dir) = store();
        let mut state = store.load();
        assert!(store.enqueue(&mut state, WorkItem::new("V1", "22", "/out")));
        assert!(store.enqueue(&mut state, WorkItem::new("V2", "18", "/out")));

        let reloaded = store.load();
        let targets: Vec<&str> = reloaded.pending.iter().map(|i| i.target.as_str()).collect();
        assert_eq!(targets, vec!["V1", "V2"]);
    }

    #[test]
    fn test_unwritable_location_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::new(dir.path().join("missing").join("YTGet_Conf.json"));
        let mut state = QueueState::default();
        assert!(!store.enqueue(&mut state, WorkItem::new("V1", "22", "/out")));
        // In-memory state still reflects the mutation.
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn test_requeue_failed_appends_to_tail() {
        let (store, _dir) = store();
        let mut state = QueueState {
            pending: vec![WorkItem::new("V1", "22", "/out")],
            failed: vec![WorkItem::new("V2", "18", "/out")],
            ..Default::default()
        };
        assert_eq!(store.requeue_failed(&mut state), 1);
        assert!(state.failed.is_empty());
        assert_eq!(state.pending[1].target, "V2");
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_blank_default_destination_clears() {
        let (store, _dir) = store();
        let mut state = QueueState::default();
        store.set_default_destination(&mut state, Some("/media".into()));
        assert_eq!(store.load().default_destination.as_deref(), Some("/media"));
        store.set_default_destination(&mut state, Some("  ".into()));
        assert_eq!(store.load().default_destination, None);
    }
}
