//! String-keyed JSON stores.
//!
//! Each store mirrors one JSON object file (`{ key: value, ... }`). The map is
//! loaded once and every mutation rewrites the file.

use crate::metadata::atomic::{atomic_read_json, atomic_write_json};
use crate::{GalleryError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tracing::{debug, warn};

/// A persistent map from string keys to `V`.
#[derive(Debug)]
pub struct JsonStore<V> {
    path: PathBuf,
    entries: RwLock<HashMap<String, V>>,
}

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Open the store backed by `path`.
    ///
    /// A missing file is an empty store. A corrupt file, or entries that no
    /// longer deserialize, are logged and dropped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let raw: HashMap<String, Value> = match atomic_read_json(&path) {
            Ok(Some(raw)) => raw,
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable store {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_value::<V>(value) {
                Ok(v) => {
                    entries.insert(key, v);
                }
                Err(e) => warn!("Dropping entry {:?} from {}: {}", key, path.display(), e),
            }
        }
        debug!("Loaded {} entries from {}", entries.len(), path.display());

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, V>>> {
        self.entries.read().map_err(|_| {
            GalleryError::Other(format!("Failed to acquire read lock for {}", self.path.display()))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, V>>> {
        self.entries.write().map_err(|_| {
            GalleryError::Other(format!("Failed to acquire write lock for {}", self.path.display()))
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.read()?.get(key).cloned())
    }

    /// Copy of the whole map, for queries that must not hold the lock.
    pub fn snapshot(&self) -> Result<HashMap<String, V>> {
        Ok(self.read()?.clone())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Insert or replace `key`.
    pub fn upsert(&self, key: impl Into<String>, value: V) -> Result<()> {
        let key = key.into();
        self.commit(|next| {
            next.insert(key, value);
            Some(())
        })
        .map(|_| ())
    }

    /// Mutate the value at `key`, creating it from `Default` first if absent.
    pub fn update<F, R>(&self, key: &str, f: F) -> Result<R>
    where
        V: Default,
        F: FnOnce(&mut V) -> R,
    {
        self.commit(|next| Some(f(next.entry(key.to_string()).or_default())))?
            .ok_or_else(|| GalleryError::Other(format!("Update of {:?} did not run", key)))
    }

    pub fn remove(&self, key: &str) -> Result<Option<V>> {
        self.commit(|next| next.remove(key))
    }

    /// Apply `change` to a copy of the map and publish it once it is on disk.
    ///
    /// `change` returning `None` means nothing changed; the file is not
    /// rewritten. On a failed write the in-memory map is left untouched.
    fn commit<T>(
        &self,
        change: impl FnOnce(&mut HashMap<String, V>) -> Option<T>,
    ) -> Result<Option<T>> {
        let mut entries = self.write()?;
        let mut next = entries.clone();
        let Some(out) = change(&mut next) else {
            return Ok(None);
        };
        self.persist(&next)?;
        *entries = next;
        Ok(Some(out))
    }

    /// Last modification time of the backing file, if it exists.
    pub fn modified_at(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn persist(&self, entries: &HashMap<String, V>) -> Result<()> {
        atomic_write_json(&self.path, entries, false)
    }
}
