//! Best-score storage
//!
//! The engine only reports the final score of a round. Keeping the best one
//! is the host's job, behind the [`ScoreStore`] contract: load the previous
//! best, store the new score if it is at least as good.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreStoreError {
    #[error("failed to write high score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode high score: {0}")]
    Encode(#[from] serde_json::Error),
}

/// "Load previous best / store if greater" key-value contract
pub trait ScoreStore: Send + Sync {
    /// Previous best, 0 when nothing has been stored
    fn load_best(&self) -> u64;

    /// Store `score` if it is at least the stored best. Returns whether it was written.
    fn store_if_greater(&self, score: u64) -> Result<bool, ScoreStoreError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    best: Mutex<u64>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load_best(&self) -> u64 {
        *self.best.lock()
    }

    fn store_if_greater(&self, score: u64) -> Result<bool, ScoreStoreError> {
        let mut best = self.best.lock();
        if score < *best {
            return Ok(false);
        }
        *best = score;
        Ok(true)
    }
}

/// On-disk layout
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct HighScoreFile {
    best: u64,
}

/// Best score kept in a small JSON file
#[derive(Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    /// Serialises read-compare-write
    lock: Mutex<()>,
}

impl JsonFileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file means no score yet; a corrupt one is reported and treated the same
    fn read(&self) -> u64 {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No high score at {}, starting fresh", self.path.display());
                return 0;
            }
            Err(e) => {
                log::warn!("Could not read high score {}: {}", self.path.display(), e);
                return 0;
            }
        };
        match serde_json::from_str::<HighScoreFile>(&json) {
            Ok(file) => file.best,
            Err(e) => {
                log::warn!("Ignoring corrupt high score {}: {}", self.path.display(), e);
                0
            }
        }
    }

    fn write(&self, best: u64) -> Result<(), ScoreStoreError> {
        let io_err = |source| ScoreStoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&HighScoreFile { best })?;
        fs::write(&self.path, json).map_err(io_err)?;
        log::info!("High score {} saved to {}", best, self.path.display());
        Ok(())
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn load_best(&self) -> u64 {
        let _guard = self.lock.lock();
        self.read()
    }

    fn store_if_greater(&self, score: u64) -> Result<bool, ScoreStoreError> {
        let _guard = self.lock.lock();
        if score < self.read() {
            return Ok(false);
        }
        self.write(score)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sandwave-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir.join("highscore.json")
    }

    #[test]
    fn test_memory_store_keeps_best() {
        let store = MemoryScoreStore::new();
        assert_eq!(store.load_best(), 0);
        assert!(store.store_if_greater(120).unwrap());
        assert!(!store.store_if_greater(80).unwrap());
        assert_eq!(store.load_best(), 120);
    }

    #[test]
    fn test_equal_score_is_stored() {
        let store = MemoryScoreStore::new();
        store.store_if_greater(50).unwrap();
        assert!(store.store_if_greater(50).unwrap());
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = scratch_path("round-trip");
        let store = JsonFileScoreStore::new(&path);
        assert_eq!(store.load_best(), 0);
        assert!(store.store_if_greater(321).unwrap());
        assert!(!store.store_if_greater(5).unwrap());

        // A fresh store sees what the first one wrote
        let reopened = JsonFileScoreStore::new(&path);
        assert_eq!(reopened.load_best(), 321);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_zero() {
        let path = scratch_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let store = JsonFileScoreStore::new(&path);
        assert_eq!(store.load_best(), 0);
        assert!(store.store_if_greater(7).unwrap());
        assert_eq!(store.load_best(), 7);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_write_failure_is_error() {
        let dir = scratch_path("blocked");
        let blocker = dir.parent().unwrap().to_path_buf();
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        // A regular file where the parent directory should be
        fs::write(&blocker, "").unwrap();

        let store = JsonFileScoreStore::new(&dir);
        assert!(matches!(
            store.store_if_greater(1),
            Err(ScoreStoreError::Io { .. })
        ));
        let _ = fs::remove_file(&blocker);
    }
}
