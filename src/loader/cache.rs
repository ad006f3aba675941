use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::debug;

use crate::error::Result;

struct CacheEntry<T> {
    modified: SystemTime,
    value: Arc<T>,
}

/// Memoizes loaded tables per `(path, key)`.
///
/// An entry is reused only while the file's modification time matches the
/// one observed when it was loaded; any change triggers a reload.
pub struct DatasetCache<K, T> {
    entries: Mutex<HashMap<(PathBuf, K), CacheEntry<T>>>,
}

impl<K, T> Default for DatasetCache<K, T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, T> DatasetCache<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `path`, loading it with `load` on a miss
    /// or when the file changed on disk.
    pub fn get_or_load<F>(&self, path: &Path, key: K, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let modified = std::fs::metadata(path)?.modified()?;
        let cache_key = (path.to_path_buf(), key);

        if let Some(entry) = self.lock().get(&cache_key) {
            if entry.modified == modified {
                debug!(path = %path.display(), "Dataset cache hit");
                return Ok(entry.value.clone());
            }
            debug!(path = %path.display(), "Dataset changed on disk, reloading");
        }

        // Loading happens outside the lock; a concurrent miss just loads twice.
        let value = Arc::new(load(path)?);
        self.lock().insert(
            cache_key,
            CacheEntry {
                modified,
                value: value.clone(),
            },
        );
        Ok(value)
    }

    /// Drops every entry for `path`, whatever its key.
    pub fn invalidate(&self, path: &Path) {
        self.lock().retain(|(p, _), _| p != path);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(PathBuf, K), CacheEntry<T>>> {
        // A panic inside `load` never holds the lock, so poisoning is recoverable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs::{self, File};
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn read_len(path: &Path) -> Result<usize> {
        Ok(fs::read_to_string(path)?.len())
    }

    #[test]
    fn test_cache_hit_returns_same_value() {
        let path = temp_path("ebus_fleet_cache_hit.txt");
        fs::write(&path, "abc").unwrap();
        set_mtime(&path, 1_700_000_000);

        let cache: DatasetCache<(), usize> = DatasetCache::new();
        let first = cache.get_or_load(&path, (), read_len).unwrap();
        let second = cache
            .get_or_load(&path, (), |_| panic!("should not reload"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, 3);
        assert_eq!(cache.len(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_cache_reloads_when_mtime_changes() {
        let path = temp_path("ebus_fleet_cache_mtime.txt");
        fs::write(&path, "abc").unwrap();
        set_mtime(&path, 1_700_000_000);

        let cache: DatasetCache<(), usize> = DatasetCache::new();
        assert_eq!(*cache.get_or_load(&path, (), read_len).unwrap(), 3);

        fs::write(&path, "abcdef").unwrap();
        set_mtime(&path, 1_700_000_100);

        assert_eq!(*cache.get_or_load(&path, (), read_len).unwrap(), 6);
        assert_eq!(cache.len(), 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_cache_keys_are_separate() {
        let path = temp_path("ebus_fleet_cache_keys.txt");
        fs::write(&path, "abc").unwrap();

        let cache: DatasetCache<u8, usize> = DatasetCache::new();
        cache.get_or_load(&path, 1, read_len).unwrap();
        cache.get_or_load(&path, 2, read_len).unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate(&path);
        assert!(cache.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_cache_load_error_is_not_cached() {
        let path = temp_path("ebus_fleet_cache_error.txt");
        fs::write(&path, "abc").unwrap();

        let cache: DatasetCache<(), usize> = DatasetCache::new();
        let result = cache.get_or_load(&path, (), |_| {
            Err(crate::error::PipelineError::InvalidConfig("boom".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_cache_missing_file() {
        let cache: DatasetCache<(), usize> = DatasetCache::new();
        let result = cache.get_or_load(&temp_path("ebus_fleet_cache_absent.txt"), (), read_len);
        assert!(result.is_err());
    }
}
