//! File-based distributed locking.
//!
//! Uses advisory file locks (flock) for coordination between processes.
//! Note: File locks may not work correctly on all network filesystems.
//! The OS drops the lock when the holder exits, so the TTL is recorded in the
//! lock file for diagnostics only.

use std::collections::HashMap;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::storage::file::encode_name;
use crate::storage::traits::{DistributedLock, LockGuard};

/// File-based lock manager.
pub struct FileLock {
    /// Directory for lock files.
    locks_dir: PathBuf,
    /// Open handles of the locks this process holds.
    active_locks: Arc<Mutex<HashMap<String, std::fs::File>>>,
}

impl FileLock {
    /// Create a new file lock manager.
    #[must_use]
    pub fn new(locks_dir: PathBuf) -> Self {
        Self {
            locks_dir,
            active_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the lock file path for a key.
    fn lock_path(&self, key: &str) -> PathBuf {
        self.locks_dir.join(format!("{}.lock", encode_name(key)))
    }

    /// Take the lock without blocking. Returns `false` if another handle holds it.
    fn try_lock_file(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        std::fs::create_dir_all(&self.locks_dir)?;

        // Lock files are never deleted: unlinking one while a waiter holds an
        // open handle would let two owners lock different inodes.
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(key))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
                writeln!(
                    file,
                    "{{\"pid\":{},\"acquired_at\":{},\"ttl_ms\":{}}}",
                    std::process::id(),
                    chrono::Utc::now().timestamp_millis(),
                    ttl.as_millis()
                )
                .ok();

                self.active_locks.lock().insert(key.to_string(), file);
                Ok(true)
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(false),
            Err(e) => Err(StorageError::LockFailed(e.to_string())),
        }
    }
}

#[async_trait]
impl DistributedLock for FileLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> StorageResult<Option<LockGuard>> {
        if !self.try_lock_file(key, ttl)? {
            return Ok(None);
        }

        let active_locks = Arc::clone(&self.active_locks);
        let key_for_release = key.to_string();

        Ok(Some(LockGuard::new(key.to_string(), move || async move {
            if let Some(file) = active_locks.lock().remove(&key_for_release) {
                let _ = FileExt::unlock(&file);
            }
        })))
    }
}
