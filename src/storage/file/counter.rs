//! File-based counter cache.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::CounterState;
use crate::error::StorageResult;
use crate::storage::file::encode_name;
use crate::storage::traits::CacheStorage;

/// File-based counter cache implementation.
///
/// Each key is one JSON file. Writes go through a temporary file and a rename
/// so readers never observe a half-written value.
pub struct FileCounterStorage {
    /// Directory for counter files.
    counters_dir: PathBuf,
}

impl FileCounterStorage {
    /// Create a new file counter storage.
    #[must_use]
    pub const fn new(counters_dir: PathBuf) -> Self {
        Self { counters_dir }
    }

    /// Get the file path for a counter.
    fn counter_path(&self, key: &str) -> PathBuf {
        self.counters_dir.join(format!("{}.json", encode_name(key)))
    }

    fn read_state(&self, key: &str) -> StorageResult<Option<CounterState>> {
        let path = self.counter_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(&path)?;
        let state: CounterState = serde_json::from_reader(file)?;
        Ok(Some(state))
    }

    fn write_state(&self, state: &CounterState) -> StorageResult<()> {
        std::fs::create_dir_all(&self.counters_dir)?;

        let path = self.counter_path(&state.key);
        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));

        let mut file = std::fs::File::create(&tmp_path)?;
        serde_json::to_writer_pretty(&file, state)?;
        file.flush()?;
        file.sync_all()?;

        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for FileCounterStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<u64>> {
        Ok(self
            .read_state(key)?
            .filter(|state| !state.is_expired())
            .map(|state| state.value))
    }

    async fn put(&self, key: &str, value: u64, ttl: Duration) -> StorageResult<()> {
        self.write_state(&CounterState::new(key.to_string(), value, ttl))
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        match std::fs::remove_file(self.counter_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (FileCounterStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileCounterStorage::new(temp_dir.path().to_path_buf());
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (storage, _temp) = create_test_storage();
        let key = "id_counter:student_id:gv:2026";

        assert_eq!(storage.get(key).await.unwrap(), None);

        storage.put(key, 41, Duration::from_secs(60)).await.unwrap();
        assert_eq!(storage.get(key).await.unwrap(), Some(41));

        storage.put(key, 42, Duration::from_secs(60)).await.unwrap();
        assert_eq!(storage.get(key).await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_expired_counter_reads_as_missing() {
        let (storage, _temp) = create_test_storage();

        storage.put("k", 5, Duration::ZERO).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_forget() {
        let (storage, _temp) = create_test_storage();

        storage.put("k", 5, Duration::from_secs(60)).await.unwrap();
        assert!(storage.forget("k").await.unwrap());
        assert!(!storage.forget("k").await.unwrap());
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_do_not_collide_after_encoding() {
        let (storage, _temp) = create_test_storage();

        storage.put("a:b", 1, Duration::from_secs(60)).await.unwrap();
        storage.put("a_b", 2, Duration::from_secs(60)).await.unwrap();

        assert_eq!(storage.get("a:b").await.unwrap(), Some(1));
        assert_eq!(storage.get("a_b").await.unwrap(), Some(2));
    }
}
