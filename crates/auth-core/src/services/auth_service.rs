//! Auth Service. Composes the Group Registry and
//! Token Service: validates groups at creation, resolves a verified
//! token's groups back to full `Group` records, and implicitly grants
//! `public` membership to every token.

use crate::error::AuthError;
use crate::models::{Group, TokenInfo, TokenRecord, TokenStatus};
use crate::services::{GroupRegistry, TokenService};
use chrono::Duration;
use std::sync::Arc;

pub const PUBLIC_GROUP: &str = "public";

pub struct AuthService {
    groups: Arc<GroupRegistry>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(groups: Arc<GroupRegistry>, tokens: Arc<TokenService>) -> Self {
        Self { groups, tokens }
    }

    /// Prepends `public` once (deduplicated) unless `include_public` is
    /// false, validates every named group resolves to an active group,
    /// then delegates to the token service.
    pub async fn create_token(
        &self,
        mut groups: Vec<String>,
        ttl: Option<Duration>,
        name: Option<String>,
        fingerprint: Option<String>,
        include_public: bool,
    ) -> Result<(String, TokenRecord), AuthError> {
        if include_public && !groups.iter().any(|g| g == PUBLIC_GROUP) {
            groups.insert(0, PUBLIC_GROUP.to_string());
        }
        dedup_preserving_order(&mut groups);

        for group_name in &groups {
            if group_name == PUBLIC_GROUP {
                continue;
            }
            let group = self
                .groups
                .get_group_by_name(group_name)
                .await?
                .ok_or_else(|| AuthError::InvalidGroup {
                    name: group_name.clone(),
                })?;
            if !group.is_active {
                return Err(AuthError::InvalidGroup {
                    name: group_name.clone(),
                });
            }
        }

        self.tokens
            .create(groups, ttl, name, fingerprint)
            .await
    }

    pub async fn verify_token(
        &self,
        token: &str,
        require_store: bool,
        validate_groups: bool,
        fingerprint: Option<&str>,
    ) -> Result<TokenInfo, AuthError> {
        let registry = Arc::clone(&self.groups);
        self.tokens
            .verify(token, require_store, validate_groups, fingerprint, move |name| {
                let registry = Arc::clone(&registry);
                async move {
                    Ok(registry
                        .get_group_by_name(&name)
                        .await?
                        .is_some_and(|g| g.is_active))
                }
            })
            .await
    }

    /// Returns the full `Group` records for a verified token's claimed
    /// groups, always including `public` even if the caller's groups list
    /// somehow omitted it.
    pub async fn resolve_token_groups(&self, token: &str) -> Result<Vec<Group>, AuthError> {
        let info = self.verify_token(token, true, false, None).await?;
        let mut names = info.groups;
        if !names.iter().any(|g| g == PUBLIC_GROUP) {
            names.insert(0, PUBLIC_GROUP.to_string());
        }
        dedup_preserving_order(&mut names);

        let mut groups = Vec::with_capacity(names.len());
        for name in names {
            if let Some(group) = self.groups.get_group_by_name(&name).await? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool, AuthError> {
        self.tokens.revoke(token).await
    }

    pub async fn revoke_token_by_name(&self, name: &str) -> Result<bool, AuthError> {
        self.tokens.revoke_by_name(name).await
    }

    pub async fn list_tokens(
        &self,
        status_filter: Option<TokenStatus>,
    ) -> Result<Vec<TokenRecord>, AuthError> {
        self.tokens.list(status_filter).await
    }

    pub fn groups(&self) -> &Arc<GroupRegistry> {
        &self.groups
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_crypto::{JwtConfig, JwtService, SigningKey};
    use auth_storage::{MemoryGroupStore, MemoryTokenStore};

    fn service() -> AuthService {
        let jwt = JwtService::new(
            JwtConfig {
                audience: "test".into(),
                default_ttl: None,
            },
            SigningKey::from_secret_unchecked(&"s".repeat(32)),
        );
        let groups = Arc::new(GroupRegistry::new(Arc::new(MemoryGroupStore::new())));
        let tokens = Arc::new(TokenService::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(jwt),
        ));
        AuthService::new(groups, tokens)
    }

    #[tokio::test]
    async fn create_token_implicitly_grants_public() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();

        let (_, record) = svc
            .create_token(vec![], None, None, None, true)
            .await
            .unwrap();
        assert_eq!(record.groups, vec![PUBLIC_GROUP.to_string()]);
    }

    #[tokio::test]
    async fn create_token_without_include_public_omits_it() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();

        let (_, record) = svc
            .create_token(vec![], None, None, None, false)
            .await
            .unwrap();
        assert!(record.groups.is_empty());
    }

    #[tokio::test]
    async fn create_token_rejects_unknown_group() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();

        let err = svc
            .create_token(vec!["finance".into()], None, None, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGroup { .. }));
    }

    #[tokio::test]
    async fn create_token_accepts_active_custom_group() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();
        svc.groups.create_group("ops", None).await.unwrap();

        let (_, record) = svc
            .create_token(vec!["ops".into()], None, None, None, true)
            .await
            .unwrap();
        assert!(record.groups.contains(&"ops".to_string()));
        assert!(record.groups.contains(&PUBLIC_GROUP.to_string()));
    }

    #[tokio::test]
    async fn resolve_token_groups_returns_full_records_including_public() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();
        svc.groups.create_group("ops", None).await.unwrap();

        let (credential, _) = svc
            .create_token(vec!["ops".into()], None, None, None, true)
            .await
            .unwrap();

        let resolved = svc.resolve_token_groups(&credential).await.unwrap();
        let names: Vec<_> = resolved.iter().map(|g| g.name.as_str()).collect();
        assert!(names.contains(&"public"));
        assert!(names.contains(&"ops"));
    }

    #[tokio::test]
    async fn verify_token_with_validate_groups_rejects_defunct_group() {
        let svc = service();
        svc.groups.ensure_reserved_groups().await.unwrap();
        let ops = svc.groups.create_group("ops", None).await.unwrap();

        let (credential, _) = svc
            .create_token(vec!["ops".into()], None, None, None, true)
            .await
            .unwrap();

        svc.groups.make_defunct(ops.id).await.unwrap();

        let err = svc
            .verify_token(&credential, true, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGroup { .. }));
    }
}
