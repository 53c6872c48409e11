//! Group Registry. Owns the `GroupStore` and enforces
//! uniqueness and reserved-name protection; knows nothing about tokens.

use crate::error::AuthError;
use crate::models::{normalize_group_name, Group};
use crate::storage::GroupStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct GroupRegistry {
    store: Arc<dyn GroupStore>,
}

impl GroupRegistry {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// Creates `public` and `admin` if no active group with that name
    /// exists yet. Safe to call from multiple registries constructed
    /// against the same backend: last writer wins, and reading before
    /// writing keeps names unique.
    pub async fn ensure_reserved_groups(&self) -> Result<(), AuthError> {
        for name in crate::models::RESERVED_GROUP_NAMES {
            if self.store.get_by_name(name).await?.is_some() {
                continue;
            }
            let group = Group::new(name.to_string(), None, true);
            self.store.put(group.id, group).await?;
        }
        Ok(())
    }

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Group, AuthError> {
        let normalized =
            normalize_group_name(name).map_err(AuthError::validation)?;

        if Group::is_reserved_name(&normalized) {
            return Err(AuthError::conflict(format!(
                "'{normalized}' is a reserved group name"
            )));
        }

        if let Some(existing) = self.store.get_by_name(&normalized).await? {
            if existing.is_active {
                return Err(AuthError::conflict(format!(
                    "group '{normalized}' already exists"
                )));
            }
        }

        let group = Group::new(normalized, description, false);
        self.store.put(group.id, group.clone()).await?;
        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> Result<Option<Group>, AuthError> {
        self.store.get(id).await
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, AuthError> {
        let normalized = normalize_group_name(name).map_err(AuthError::validation)?;
        self.store.get_by_name(&normalized).await
    }

    /// Idempotent: a second call on an already-defunct group is a no-op.
    pub async fn make_defunct(&self, id: Uuid) -> Result<(), AuthError> {
        let Some(mut group) = self.store.get(id).await? else {
            return Err(AuthError::InvalidGroup {
                name: id.to_string(),
            });
        };

        if group.is_reserved {
            return Err(AuthError::conflict(format!(
                "group '{}' is reserved and cannot be made defunct",
                group.name
            )));
        }

        if !group.is_active {
            return Ok(());
        }

        group.is_active = false;
        group.defunct_at = Some(Utc::now());
        self.store.put(id, group).await
    }

    pub async fn list_groups(&self, include_defunct: bool) -> Result<Vec<Group>, AuthError> {
        let mut groups: Vec<Group> = self
            .store
            .list_all()
            .await?
            .into_values()
            .filter(|g| include_defunct || g.is_active)
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_storage::MemoryGroupStore;

    fn registry() -> GroupRegistry {
        GroupRegistry::new(Arc::new(MemoryGroupStore::new()))
    }

    #[tokio::test]
    async fn ensure_reserved_groups_is_idempotent() {
        let reg = registry();
        reg.ensure_reserved_groups().await.unwrap();
        reg.ensure_reserved_groups().await.unwrap();

        let groups = reg.list_groups(false).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.is_reserved));
    }

    #[tokio::test]
    async fn create_group_rejects_reserved_names() {
        let reg = registry();
        let err = reg.create_group("Public", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn create_group_rejects_duplicates() {
        let reg = registry();
        reg.create_group("ops", None).await.unwrap();
        let err = reg.create_group("OPS", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn make_defunct_refuses_reserved_and_is_idempotent() {
        let reg = registry();
        reg.ensure_reserved_groups().await.unwrap();
        let public = reg.get_group_by_name("public").await.unwrap().unwrap();
        assert!(reg.make_defunct(public.id).await.is_err());

        let ops = reg.create_group("ops", None).await.unwrap();
        reg.make_defunct(ops.id).await.unwrap();
        reg.make_defunct(ops.id).await.unwrap();

        let active = reg.list_groups(false).await.unwrap();
        assert!(!active.iter().any(|g| g.name == "ops"));
        let all = reg.list_groups(true).await.unwrap();
        assert!(all.iter().any(|g| g.name == "ops"));
    }
}
