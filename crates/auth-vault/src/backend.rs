//! KV backend: implements `TokenStore`/`GroupStore` over
//! `VaultClient`. Token paths are `{prefix}/tokens/{id}`; group paths are
//! `{prefix}/groups/{id}` plus a singleton name index at
//! `{prefix}/groups/_index/names`.

use crate::client::VaultClient;
use auth_core::models::{Group, TokenRecord};
use auth_core::storage::{BackendHealth, GroupStore, TokenStore};
use auth_core::AuthError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn to_map<T: Serialize>(value: &T) -> Result<HashMap<String, Value>, AuthError> {
    match serde_json::to_value(value).map_err(|e| AuthError::storage_unavailable(e.to_string()))? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(AuthError::storage_unavailable(
            "expected object serialization",
        )),
    }
}

fn from_map<T: DeserializeOwned>(map: HashMap<String, Value>) -> Result<T, AuthError> {
    let value = Value::Object(map.into_iter().collect());
    serde_json::from_value(value).map_err(|e| AuthError::storage_unavailable(e.to_string()))
}

pub struct KvTokenStore {
    client: Arc<VaultClient>,
    prefix: String,
}

impl KvTokenStore {
    pub fn new(client: Arc<VaultClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn path(&self, id: Uuid) -> String {
        format!("{}/tokens/{}", self.prefix, id)
    }

    fn list_path(&self) -> String {
        format!("{}/tokens", self.prefix)
    }
}

#[async_trait]
impl TokenStore for KvTokenStore {
    async fn get(&self, id: Uuid) -> Result<Option<TokenRecord>, AuthError> {
        match self.client.read_secret(&self.path(id)).await? {
            Some(map) => Ok(Some(from_map(map)?)),
            None => Ok(None),
        }
    }

    /// Linear scan, an explicit tradeoff over a secondary name index
    ///; correctness unaffected.
    async fn get_by_name(&self, name: &str) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self
            .list_all()
            .await?
            .into_values()
            .find(|r| r.name.as_deref() == Some(name)))
    }

    async fn put(&self, id: Uuid, record: TokenRecord) -> Result<(), AuthError> {
        self.client.write_secret(&self.path(id), to_map(&record)?).await
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        self.client.secret_exists(&self.path(id)).await
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.get_by_name(name).await?.is_some())
    }

    async fn list_all(&self) -> Result<HashMap<Uuid, TokenRecord>, AuthError> {
        let mut out = HashMap::new();
        for key in self.client.list_secrets(&self.list_path()).await? {
            let Ok(id) = Uuid::parse_str(key.trim_end_matches('/')) else {
                continue;
            };
            if let Some(record) = self.get(id).await? {
                out.insert(id, record);
            }
        }
        Ok(out)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let existed = self.exists(id).await?;
        if existed {
            self.client.delete_secret(&self.path(id), false).await?;
        }
        Ok(existed)
    }

    /// Hard-deletes everything for a deterministic reset.
    async fn clear(&self) -> Result<(), AuthError> {
        for key in self.client.list_secrets(&self.list_path()).await? {
            self.client
                .delete_secret(&format!("{}/{}", self.list_path(), key.trim_end_matches('/')), true)
                .await?;
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self.client.list_secrets(&self.list_path()).await?.len())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[async_trait]
impl BackendHealth for KvTokenStore {
    async fn healthy(&self) -> bool {
        self.client.health_check().await
    }
}

pub struct KvGroupStore {
    client: Arc<VaultClient>,
    prefix: String,
}

impl KvGroupStore {
    pub fn new(client: Arc<VaultClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    fn path(&self, id: Uuid) -> String {
        format!("{}/groups/{}", self.prefix, id)
    }

    fn list_path(&self) -> String {
        format!("{}/groups", self.prefix)
    }

    fn index_path(&self) -> String {
        format!("{}/groups/_index/names", self.prefix)
    }

    async fn read_index(&self) -> Result<HashMap<String, Uuid>, AuthError> {
        match self.client.read_secret(&self.index_path()).await? {
            Some(map) => Ok(map
                .into_iter()
                .filter_map(|(name, v)| {
                    v.as_str().and_then(|s| Uuid::parse_str(s).ok()).map(|id| (name, id))
                })
                .collect()),
            None => Ok(HashMap::new()),
        }
    }

    async fn write_index(&self, index: &HashMap<String, Uuid>) -> Result<(), AuthError> {
        let map: HashMap<String, Value> = index
            .iter()
            .map(|(name, id)| (name.clone(), Value::String(id.to_string())))
            .collect();
        self.client.write_secret(&self.index_path(), map).await
    }

    /// Scans every group looking for `name` when the index has no usable
    /// entry. On a hit, repairs `index` (caller's in-memory copy, already
    /// reflecting any healing done before this call) and persists it.
    async fn get_by_name_scan(
        &self,
        name: &str,
        index: &mut HashMap<String, Uuid>,
    ) -> Result<Option<Group>, AuthError> {
        let groups = self.list_all().await?;
        match groups.into_iter().find(|(_, group)| group.name == name) {
            Some((id, group)) => {
                index.insert(name.to_string(), id);
                self.write_index(index).await?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GroupStore for KvGroupStore {
    async fn get(&self, id: Uuid) -> Result<Option<Group>, AuthError> {
        match self.client.read_secret(&self.path(id)).await? {
            Some(map) => Ok(Some(from_map(map)?)),
            None => Ok(None),
        }
    }

    /// The name index is written after the group record, so it is
    /// treated as a hint, not a source of truth: a stale or dangling
    /// entry is healed (removed and, if the group is found by the
    /// fallback scan, rewritten) rather than trusted outright. A missing
    /// entry (the index write never landed, e.g. a crash between the two
    /// writes in `put`) falls back to a linear scan over all groups so
    /// the group is still reachable by name, and the index is repaired
    /// opportunistically once found.
    async fn get_by_name(&self, name: &str) -> Result<Option<Group>, AuthError> {
        let mut index = self.read_index().await?;
        match index.get(name).copied() {
            Some(id) => match self.get(id).await? {
                Some(group) if group.name == name => Ok(Some(group)),
                _ => {
                    index.remove(name);
                    self.write_index(&index).await?;
                    self.get_by_name_scan(name, &mut index).await
                }
            },
            None => self.get_by_name_scan(name, &mut index).await,
        }
    }

    async fn put(&self, id: Uuid, group: Group) -> Result<(), AuthError> {
        self.client.write_secret(&self.path(id), to_map(&group)?).await?;
        let mut index = self.read_index().await?;
        index.retain(|_, existing| *existing != id);
        index.insert(group.name.clone(), id);
        self.write_index(&index).await
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        self.client.secret_exists(&self.path(id)).await
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.get_by_name(name).await?.is_some())
    }

    /// Skips the `_index` entry.
    async fn list_all(&self) -> Result<HashMap<Uuid, Group>, AuthError> {
        let mut out = HashMap::new();
        for key in self.client.list_secrets(&self.list_path()).await? {
            let trimmed = key.trim_end_matches('/');
            if trimmed == "_index" {
                continue;
            }
            let Ok(id) = Uuid::parse_str(trimmed) else {
                continue;
            };
            if let Some(group) = self.get(id).await? {
                out.insert(id, group);
            }
        }
        Ok(out)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let existed = self.exists(id).await?;
        if existed {
            self.client.delete_secret(&self.path(id), false).await?;
        }
        Ok(existed)
    }

    async fn clear(&self) -> Result<(), AuthError> {
        for key in self.client.list_secrets(&self.list_path()).await? {
            let trimmed = key.trim_end_matches('/');
            if trimmed == "_index" {
                continue;
            }
            self.client
                .delete_secret(&format!("{}/{}", self.list_path(), trimmed), true)
                .await?;
        }
        self.client.delete_secret(&self.index_path(), true).await?;
        Ok(())
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self
            .client
            .list_secrets(&self.list_path())
            .await?
            .iter()
            .filter(|k| k.trim_end_matches('/') != "_index")
            .count())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[async_trait]
impl BackendHealth for KvGroupStore {
    async fn healthy(&self) -> bool {
        self.client.health_check().await
    }
}
