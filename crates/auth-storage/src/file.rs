//! JSON-on-disk backend with mtime-cached reloads.
//!
//! `get`/`exists`/`list_all`/`len` are served entirely from the in-process
//! cache and never touch disk. `reload()` stats the file and only
//! re-decodes it when the on-disk mtime is strictly newer than what was
//! cached; `put`/`delete`/`clear` write through immediately and refresh the
//! cached mtime. Writes are atomic via write-to-temp-then-rename, so a
//! concurrent reader always observes one complete file or the other, but
//! this backend is single-writer-per-file — it does not arbitrate between
//! multiple writers.

use auth_core::storage::{BackendHealth, GroupStore, TokenStore};
use async_trait::async_trait;
use auth_core::models::{Group, TokenRecord};
use auth_core::AuthError;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

struct Cache<T> {
    records: HashMap<Uuid, T>,
    mtime: Option<SystemTime>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            mtime: None,
        }
    }
}

fn io_err(context: &str, e: std::io::Error) -> AuthError {
    AuthError::storage_unavailable(format!("{context}: {e}"))
}

fn current_mtime(path: &Path) -> std::io::Result<Option<SystemTime>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified()?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn load_from_disk<T: DeserializeOwned>(path: &Path) -> std::io::Result<HashMap<Uuid, T>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e),
    }
}

fn write_atomic<T: Serialize>(path: &Path, records: &HashMap<Uuid, T>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(records)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Reloads `cache` from `path` if the on-disk mtime is strictly newer than
/// the cached one, or clears the cache if the file has been deleted.
fn reload_if_stale<T: DeserializeOwned>(path: &Path, cache: &Mutex<Cache<T>>) -> Result<(), AuthError> {
    let disk_mtime = current_mtime(path).map_err(|e| io_err("stat", e))?;
    let mut guard = cache.lock();
    match disk_mtime {
        None => {
            if !guard.records.is_empty() {
                guard.records.clear();
            }
            guard.mtime = None;
        }
        Some(mtime) => {
            let stale = match guard.mtime {
                Some(cached) => mtime > cached,
                None => true,
            };
            if stale {
                let records = load_from_disk(path).map_err(|e| io_err("read", e))?;
                guard.records = records;
                guard.mtime = Some(mtime);
            }
        }
    }
    Ok(())
}

pub struct FileTokenStore {
    path: PathBuf,
    cache: Mutex<Cache<TokenRecord>>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let store = Self {
            path,
            cache: Mutex::new(Cache::default()),
        };
        store.reload_sync()?;
        Ok(store)
    }

    fn reload_sync(&self) -> Result<(), AuthError> {
        reload_if_stale(&self.path, &self.cache)
    }

    fn write_through(&self) -> Result<(), AuthError> {
        let guard = self.cache.lock();
        write_atomic(&self.path, &guard.records).map_err(|e| io_err("write", e))?;
        drop(guard);
        // Refresh cached mtime to the value we just wrote.
        let mtime = current_mtime(&self.path).map_err(|e| io_err("stat", e))?;
        self.cache.lock().mtime = mtime;
        Ok(())
    }

    fn name_lookup(&self, name: &str) -> Option<TokenRecord> {
        self.cache
            .lock()
            .records
            .values()
            .find(|r| r.name.as_deref() == Some(name))
            .cloned()
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, id: Uuid) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.cache.lock().records.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.name_lookup(name))
    }

    async fn put(&self, id: Uuid, record: TokenRecord) -> Result<(), AuthError> {
        self.cache.lock().records.insert(id, record);
        self.write_through()
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.cache.lock().records.contains_key(&id))
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.name_lookup(name).is_some())
    }

    async fn list_all(&self) -> Result<HashMap<Uuid, TokenRecord>, AuthError> {
        Ok(self.cache.lock().records.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let removed = self.cache.lock().records.remove(&id).is_some();
        if removed {
            self.write_through()?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.cache.lock().records.clear();
        self.write_through()
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self.cache.lock().records.len())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        self.reload_sync()
    }
}

#[async_trait]
impl BackendHealth for FileTokenStore {
    async fn healthy(&self) -> bool {
        true
    }
}

pub struct FileGroupStore {
    path: PathBuf,
    cache: Mutex<Cache<Group>>,
}

impl FileGroupStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let store = Self {
            path,
            cache: Mutex::new(Cache::default()),
        };
        store.reload_sync()?;
        Ok(store)
    }

    fn reload_sync(&self) -> Result<(), AuthError> {
        reload_if_stale(&self.path, &self.cache)
    }

    fn write_through(&self) -> Result<(), AuthError> {
        let guard = self.cache.lock();
        write_atomic(&self.path, &guard.records).map_err(|e| io_err("write", e))?;
        drop(guard);
        let mtime = current_mtime(&self.path).map_err(|e| io_err("stat", e))?;
        self.cache.lock().mtime = mtime;
        Ok(())
    }

    fn name_lookup(&self, name: &str) -> Option<Group> {
        self.cache
            .lock()
            .records
            .values()
            .find(|g| g.name == name)
            .cloned()
    }
}

#[async_trait]
impl GroupStore for FileGroupStore {
    async fn get(&self, id: Uuid) -> Result<Option<Group>, AuthError> {
        Ok(self.cache.lock().records.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Group>, AuthError> {
        Ok(self.name_lookup(name))
    }

    async fn put(&self, id: Uuid, group: Group) -> Result<(), AuthError> {
        self.cache.lock().records.insert(id, group);
        self.write_through()
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.cache.lock().records.contains_key(&id))
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.name_lookup(name).is_some())
    }

    async fn list_all(&self) -> Result<HashMap<Uuid, Group>, AuthError> {
        Ok(self.cache.lock().records.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let removed = self.cache.lock().records.remove(&id).is_some();
        if removed {
            self.write_through()?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.cache.lock().records.clear();
        self.write_through()
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self.cache.lock().records.len())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        self.reload_sync()
    }
}

#[async_trait]
impl BackendHealth for FileGroupStore {
    async fn healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_core::models::TokenStatus;
    use chrono::Utc;
    use std::thread::sleep;
    use std::time::Duration;

    fn sample(id: Uuid) -> TokenRecord {
        TokenRecord {
            id,
            name: None,
            groups: vec!["public".into()],
            status: TokenStatus::Active,
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
            fingerprint: None,
        }
    }

    #[tokio::test]
    async fn writes_are_visible_to_a_second_handle_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let a = FileTokenStore::new(&path).unwrap();
        let b = FileTokenStore::new(&path).unwrap();

        let id1 = Uuid::new_v4();
        a.put(id1, sample(id1)).await.unwrap();

        b.reload().await.unwrap();
        assert!(b.get(id1).await.unwrap().is_some());

        // No intervening mtime change: b's second get must not see a
        // record a writes after this point, until reload() is called again.
        sleep(Duration::from_millis(10));
        let id2 = Uuid::new_v4();
        a.put(id2, sample(id2)).await.unwrap();
        assert!(b.get(id2).await.unwrap().is_none());

        b.reload().await.unwrap();
        assert!(b.get(id2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleted_file_clears_the_cache_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileTokenStore::new(&path).unwrap();
        let id = Uuid::new_v4();
        store.put(id, sample(id)).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
