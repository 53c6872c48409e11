//! Token Service. Pure credential operations over a
//! `TokenStore` and a signing key; does not know groups exist beyond
//! storing and returning a list of names.

use crate::error::AuthError;
use crate::models::{validate_token_name, TokenInfo, TokenRecord, TokenStatus};
use crate::storage::TokenStore;
use auth_crypto::JwtService;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct TokenService {
    store: Arc<dyn TokenStore>,
    jwt: Arc<JwtService>,
}

impl TokenService {
    pub fn new(store: Arc<dyn TokenStore>, jwt: Arc<JwtService>) -> Self {
        Self { store, jwt }
    }

    /// Issues a new credential. Returns the signed string alongside the
    /// record that was persisted; the signed string itself is never
    /// stored anywhere and exists only for the caller to hand back.
    pub async fn create(
        &self,
        groups: Vec<String>,
        ttl: Option<Duration>,
        name: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<(String, TokenRecord), AuthError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let normalized_name = match name {
            Some(n) => Some(validate_token_name(&n).map_err(AuthError::validation)?),
            None => None,
        };

        if let Some(n) = &normalized_name {
            if self.store.exists_name(n).await? {
                return Err(AuthError::conflict(format!(
                    "token name '{n}' already in use"
                )));
            }
        }

        let record = TokenRecord {
            id,
            name: normalized_name,
            groups: groups.clone(),
            status: TokenStatus::Active,
            created_at: now,
            expires_at: ttl.map(|d| now + d),
            revoked_at: None,
            fingerprint,
        };

        self.store.put(id, record.clone()).await?;

        let credential =
            self.jwt
                .sign(id, groups, ttl)
                .map_err(|e| AuthError::TokenValidationError {
                    reason: e.to_string(),
                })?;

        Ok((credential, record))
    }

    /// Verifies signature/audience/expiry, optionally cross-checks the
    /// store, fingerprint, and group validity. `validate_groups` consults
    /// `group_is_valid` for each claimed group name; reserved groups
    /// always pass that check and don't need a lookup.
    pub async fn verify<F, Fut>(
        &self,
        token: &str,
        require_store: bool,
        validate_groups: bool,
        fingerprint: Option<&str>,
        group_is_valid: F,
    ) -> Result<TokenInfo, AuthError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<bool, AuthError>>,
    {
        let claims = self
            .jwt
            .verify(token)
            .map_err(|e| AuthError::TokenValidationError {
                reason: e.to_string(),
            })?;

        let jti = claims.jti;

        if require_store {
            let record = self.store.get(jti).await?.ok_or_else(|| {
                AuthError::TokenNotFound {
                    jti: jti.to_string(),
                }
            })?;

            if record.status == TokenStatus::Revoked {
                return Err(AuthError::TokenRevoked {
                    jti: jti.to_string(),
                });
            }
            if record.is_expired(Utc::now()) {
                return Err(AuthError::TokenExpired {
                    jti: jti.to_string(),
                });
            }
            if let (Some(expected), Some(supplied)) = (&record.fingerprint, fingerprint) {
                if expected != supplied {
                    return Err(AuthError::FingerprintMismatch);
                }
            }
        }

        if validate_groups {
            for group in &claims.groups {
                if crate::models::Group::is_reserved_name(group) {
                    continue;
                }
                if !group_is_valid(group.clone()).await? {
                    return Err(AuthError::InvalidGroup {
                        name: group.clone(),
                    });
                }
            }
        }

        Ok(TokenInfo {
            jti,
            groups: claims.groups,
            issued_at: chrono::DateTime::from_timestamp(claims.iat, 0).unwrap_or_else(Utc::now),
            expires_at: claims
                .exp
                .and_then(|e| chrono::DateTime::from_timestamp(e, 0)),
        })
    }

    /// Returns `false` if the record was already revoked; idempotent.
    pub async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self
            .jwt
            .verify(token)
            .map_err(|e| AuthError::TokenValidationError {
                reason: e.to_string(),
            })?;
        self.revoke_record(claims.jti).await
    }

    pub async fn revoke_by_name(&self, name: &str) -> Result<bool, AuthError> {
        let normalized = validate_token_name(name).map_err(AuthError::validation)?;
        let record =
            self.store
                .get_by_name(&normalized)
                .await?
                .ok_or_else(|| AuthError::TokenNotFound {
                    jti: normalized.clone(),
                })?;
        self.revoke_record(record.id).await
    }

    async fn revoke_record(&self, id: Uuid) -> Result<bool, AuthError> {
        let Some(mut record) = self.store.get(id).await? else {
            return Err(AuthError::TokenNotFound { jti: id.to_string() });
        };
        if record.status == TokenStatus::Revoked {
            return Ok(false);
        }
        record.status = TokenStatus::Revoked;
        record.revoked_at = Some(Utc::now());
        self.store.put(id, record).await?;
        Ok(true)
    }

    pub async fn list(
        &self,
        status_filter: Option<TokenStatus>,
    ) -> Result<Vec<TokenRecord>, AuthError> {
        let mut records: Vec<TokenRecord> = self
            .store
            .list_all()
            .await?
            .into_values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<TokenRecord>, AuthError> {
        let normalized = validate_token_name(name).map_err(AuthError::validation)?;
        self.store.get_by_name(&normalized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_crypto::{JwtConfig, SigningKey};
    use auth_storage::MemoryTokenStore;

    fn service() -> TokenService {
        let jwt = JwtService::new(
            JwtConfig {
                audience: "test".into(),
                default_ttl: None,
            },
            SigningKey::from_secret_unchecked(&"s".repeat(32)),
        );
        TokenService::new(Arc::new(MemoryTokenStore::new()), Arc::new(jwt))
    }

    async fn always_valid(_group: String) -> Result<bool, AuthError> {
        Ok(true)
    }

    #[tokio::test]
    async fn create_then_verify_round_trips() {
        let svc = service();
        let (credential, record) = svc
            .create(vec!["public".into()], None, Some("svc".into()), None)
            .await
            .unwrap();

        let info = svc
            .verify(&credential, true, false, None, always_valid)
            .await
            .unwrap();
        assert_eq!(info.jti, record.id);
        assert_eq!(info.groups, vec!["public".to_string()]);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let svc = service();
        svc.create(vec![], None, Some("svc".into()), None)
            .await
            .unwrap();
        let err = svc
            .create(vec![], None, Some("svc".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn revoked_token_fails_verification() {
        let svc = service();
        let (credential, _) = svc.create(vec![], None, None, None).await.unwrap();
        assert!(svc.revoke(&credential).await.unwrap());
        assert!(!svc.revoke(&credential).await.unwrap());

        let err = svc
            .verify(&credential, true, false, None, always_valid)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked { .. }));
    }

    #[tokio::test]
    async fn missing_record_fails_verification_when_store_required() {
        let svc = service();
        let (credential, record) = svc.create(vec![], None, None, None).await.unwrap();
        svc.store.delete(record.id).await.unwrap();

        let err = svc
            .verify(&credential, true, false, None, always_valid)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenNotFound { .. }));
    }

    #[tokio::test]
    async fn fingerprint_mismatch_is_rejected() {
        let svc = service();
        let (credential, _) = svc
            .create(vec![], None, None, Some("fp-1".into()))
            .await
            .unwrap();

        let err = svc
            .verify(&credential, true, false, Some("fp-2"), always_valid)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::FingerprintMismatch));
    }

    #[tokio::test]
    async fn verify_without_store_skips_revocation_check() {
        let svc = service();
        let (credential, _) = svc.create(vec![], None, None, None).await.unwrap();
        svc.revoke(&credential).await.unwrap();

        assert!(svc
            .verify(&credential, false, false, None, always_valid)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn validate_groups_rejects_unknown_group() {
        let svc = service();
        let (credential, _) = svc
            .create(vec!["finance".into()], None, None, None)
            .await
            .unwrap();

        async fn none_valid(_g: String) -> Result<bool, AuthError> {
            Ok(false)
        }

        let err = svc
            .verify(&credential, true, true, None, none_valid)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGroup { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let svc = service();
        let (c1, _) = svc.create(vec![], None, None, None).await.unwrap();
        svc.create(vec![], None, None, None).await.unwrap();
        svc.revoke(&c1).await.unwrap();

        let revoked = svc.list(Some(TokenStatus::Revoked)).await.unwrap();
        assert_eq!(revoked.len(), 1);
        let all = svc.list(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
