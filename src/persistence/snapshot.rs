//! Snapshot Save and Load
//!
//! Serializes the whole keyspace to a JSON file and restores it at
//! startup. Saving rotates any existing snapshot to `<path>.bak` before
//! writing, so a failed write always leaves the previous state
//! recoverable.

use crate::storage::{Keyspace, Snapshot};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors from snapshot I/O. Per the server's error policy these are
/// reported to the operator via logs, never to client connections.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure (rotate, write, read)
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Snapshot (de)serialization failure
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Snapshot persistence for one keyspace file.
#[derive(Debug)]
pub struct Persistence {
    path: PathBuf,
}

impl Persistence {
    /// Creates a persistence handle for the given snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rotation target: the snapshot path with `.bak` appended.
    pub fn backup_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Saves a point-in-time consistent snapshot of the keyspace.
    ///
    /// The view is serialized under the keyspace's exclusive lock (the
    /// same lock class as a mutating command), then any existing snapshot
    /// file is rotated to the backup name before the new one is written.
    /// Serialization happens first so an encoding failure touches nothing
    /// on disk, and a failed write leaves the rotated backup intact.
    pub fn save(&self, keyspace: &Keyspace) -> Result<(), PersistenceError> {
        let data = keyspace.with_snapshot(|snapshot| serde_json::to_vec(snapshot))?;

        if self.path.exists() {
            fs::rename(&self.path, self.backup_path())?;
        }
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Populates the keyspace from a previously saved snapshot.
    ///
    /// A missing snapshot file is not an error: the keyspace is simply
    /// left empty.
    pub fn load(&self, keyspace: &Keyspace) -> Result<(), PersistenceError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&data)?;
        keyspace.restore(snapshot);
        Ok(())
    }

    /// Runs [`Persistence::save`] on a detached blocking task.
    ///
    /// Fire-and-forget: completion or failure is observable only via the
    /// logs, never via a client-facing signal.
    pub fn background_save(persistence: &Arc<Persistence>, keyspace: &Arc<Keyspace>) {
        let persistence = Arc::clone(persistence);
        let keyspace = Arc::clone(keyspace);
        tokio::task::spawn_blocking(move || match persistence.save(&keyspace) {
            Ok(()) => {
                info!(path = %persistence.path.display(), "background snapshot saved")
            }
            Err(e) => {
                error!(error = %e, path = %persistence.path.display(), "background snapshot failed")
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn temp_path() -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("flintkv_test_{}_{}.json", std::process::id(), n))
    }

    fn cleanup(persistence: &Persistence) {
        let _ = fs::remove_file(persistence.path());
        let _ = fs::remove_file(persistence.backup_path());
    }

    #[test]
    fn save_and_load_round_trip() {
        let persistence = Persistence::new(temp_path());
        let keyspace = Keyspace::new();

        keyspace.set("name", "flint");
        keyspace.rpush("queue", &["a".into(), "b".into()]);
        keyspace.hset("user", &[("id".into(), "7".into())]);
        keyspace.sadd("tags", &["x".into()]);
        keyspace.zadd("scores", &[(1.5, "m".into())]);

        persistence.save(&keyspace).expect("save failed");

        let restored = Keyspace::new();
        persistence.load(&restored).expect("load failed");

        assert_eq!(restored.get("name"), Some("flint".to_string()));
        assert_eq!(restored.llen("queue"), 2);
        assert_eq!(restored.hget("user", "id"), Some("7".to_string()));
        assert!(restored.sismember("tags", "x"));
        assert_eq!(restored.zrange("scores", 0, -1), vec!["m".to_string()]);

        cleanup(&persistence);
    }

    #[test]
    fn save_rotates_the_previous_snapshot() {
        let persistence = Persistence::new(temp_path());
        let keyspace = Keyspace::new();

        keyspace.set("generation", "first");
        persistence.save(&keyspace).expect("first save failed");

        keyspace.set("generation", "second");
        persistence.save(&keyspace).expect("second save failed");

        // The backup holds the first generation
        let backup = fs::read_to_string(persistence.backup_path()).unwrap();
        assert!(backup.contains("first"));
        let current = fs::read_to_string(persistence.path()).unwrap();
        assert!(current.contains("second"));

        cleanup(&persistence);
    }

    #[test]
    fn load_without_a_snapshot_is_not_an_error() {
        let persistence = Persistence::new(temp_path());
        let keyspace = Keyspace::new();

        persistence.load(&keyspace).expect("missing file must be ok");
        assert_eq!(keyspace.counts().strings, 0);
    }

    #[test]
    fn load_rejects_a_corrupt_snapshot() {
        let persistence = Persistence::new(temp_path());
        fs::write(persistence.path(), b"not json").unwrap();

        let keyspace = Keyspace::new();
        let result = persistence.load(&keyspace);
        assert!(matches!(result, Err(PersistenceError::Encode(_))));

        cleanup(&persistence);
    }

    #[tokio::test]
    async fn background_save_completes_and_logs_only() {
        let persistence = Arc::new(Persistence::new(temp_path()));
        let keyspace = Arc::new(Keyspace::new());
        keyspace.set("k", "v");

        Persistence::background_save(&persistence, &keyspace);

        // Fire-and-forget: poll until the detached task has written the file
        let mut written = false;
        for _ in 0..50 {
            if persistence.path().exists() {
                written = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(written, "background save never wrote the snapshot");

        cleanup(&persistence);
    }
}
