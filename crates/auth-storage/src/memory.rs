//! In-memory backend. Two `DashMap`s per store (id -> record,
//! name -> id); every operation is O(1) and nothing ever touches disk or the
//! network. Used by unit tests and ephemeral deployment modes.

use auth_core::storage::{BackendHealth, GroupStore, TokenStore};
use async_trait::async_trait;
use auth_core::models::{Group, TokenRecord};
use auth_core::AuthError;
use dashmap::DashMap;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryTokenStore {
    records: DashMap<Uuid, TokenRecord>,
    by_name: DashMap<String, Uuid>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, id: Uuid) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<TokenRecord>, AuthError> {
        let Some(id) = self.by_name.get(name).map(|r| *r) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn put(&self, id: Uuid, record: TokenRecord) -> Result<(), AuthError> {
        if let Some(name) = &record.name {
            self.by_name.insert(name.clone(), id);
        }
        self.records.insert(id, record);
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.records.contains_key(&id))
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.by_name.contains_key(name))
    }

    async fn list_all(&self) -> Result<HashMap<Uuid, TokenRecord>, AuthError> {
        Ok(self
            .records
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let removed = self.records.remove(&id);
        if let Some((_, record)) = &removed {
            if let Some(name) = &record.name {
                self.by_name.remove(name);
            }
        }
        Ok(removed.is_some())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.records.clear();
        self.by_name.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self.records.len())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[async_trait]
impl BackendHealth for MemoryTokenStore {
    async fn healthy(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct MemoryGroupStore {
    groups: DashMap<Uuid, Group>,
    by_name: DashMap<String, Uuid>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn get(&self, id: Uuid) -> Result<Option<Group>, AuthError> {
        Ok(self.groups.get(&id).map(|r| r.clone()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Group>, AuthError> {
        let Some(id) = self.by_name.get(name).map(|r| *r) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn put(&self, id: Uuid, group: Group) -> Result<(), AuthError> {
        self.by_name.insert(group.name.clone(), id);
        self.groups.insert(id, group);
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.groups.contains_key(&id))
    }

    async fn exists_name(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.by_name.contains_key(name))
    }

    async fn list_all(&self) -> Result<HashMap<Uuid, Group>, AuthError> {
        Ok(self
            .groups
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let removed = self.groups.remove(&id);
        if let Some((_, group)) = &removed {
            self.by_name.remove(&group.name);
        }
        Ok(removed.is_some())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.groups.clear();
        self.by_name.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, AuthError> {
        Ok(self.groups.len())
    }

    async fn reload(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[async_trait]
impl BackendHealth for MemoryGroupStore {
    async fn healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use auth_core::models::TokenStatus;

    fn sample_record(id: Uuid, name: Option<&str>) -> TokenRecord {
        TokenRecord {
            id,
            name: name.map(|s| s.to_string()),
            groups: vec!["public".into()],
            status: TokenStatus::Active,
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
            fingerprint: None,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryTokenStore::new();
        let id = Uuid::new_v4();
        store.put(id, sample_record(id, Some("svc"))).await.unwrap();

        assert!(store.exists(id).await.unwrap());
        assert!(store.exists_name("svc").await.unwrap());
        assert_eq!(store.get(id).await.unwrap().unwrap().id, id);
        assert_eq!(store.get_by_name("svc").await.unwrap().unwrap().id, id);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_name_index() {
        let store = MemoryTokenStore::new();
        let id = Uuid::new_v4();
        store.put(id, sample_record(id, Some("svc"))).await.unwrap();
        assert!(store.delete(id).await.unwrap());
        assert!(!store.exists(id).await.unwrap());
        assert!(!store.exists_name("svc").await.unwrap());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn clear_empties_both_maps() {
        let store = MemoryGroupStore::new();
        let id = Uuid::new_v4();
        store
            .put(id, Group::new("temp".into(), None, false))
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(!store.exists_name("temp").await.unwrap());
    }
}
