//! Storage protocols: object-safe async traits implemented by each
//! backend crate. The three backends (memory, file, vault) are concrete
//! implementations; a factory higher up the stack returns a
//! `(Arc<dyn TokenStore>, Arc<dyn GroupStore>)` pair without the caller
//! knowing which.

use crate::error::AuthError;
use crate::models::{Group, TokenRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<TokenRecord>, AuthError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<TokenRecord>, AuthError>;
    async fn put(&self, id: Uuid, record: TokenRecord) -> Result<(), AuthError>;
    async fn exists(&self, id: Uuid) -> Result<bool, AuthError>;
    async fn exists_name(&self, name: &str) -> Result<bool, AuthError>;
    async fn list_all(&self) -> Result<HashMap<Uuid, TokenRecord>, AuthError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
    async fn len(&self) -> Result<usize, AuthError>;
    async fn is_empty(&self) -> Result<bool, AuthError> {
        Ok(self.len().await? == 0)
    }
    /// No-op for remote backends; rereads on-disk state if the file
    /// backend's cached mtime is stale.
    async fn reload(&self) -> Result<(), AuthError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Group>, AuthError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Group>, AuthError>;
    async fn put(&self, id: Uuid, group: Group) -> Result<(), AuthError>;
    async fn exists(&self, id: Uuid) -> Result<bool, AuthError>;
    async fn exists_name(&self, name: &str) -> Result<bool, AuthError>;
    async fn list_all(&self) -> Result<HashMap<Uuid, Group>, AuthError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
    async fn len(&self) -> Result<usize, AuthError>;
    async fn is_empty(&self) -> Result<bool, AuthError> {
        Ok(self.len().await? == 0)
    }
    async fn reload(&self) -> Result<(), AuthError>;
}

/// Constructed-backend pair exposes a cheap health probe so a host's own
/// health endpoint (out of this crate's scope) can check backend liveness.
#[async_trait]
pub trait BackendHealth: Send + Sync {
    async fn healthy(&self) -> bool;
}
