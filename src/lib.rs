//! Public facade for the shared auth library.
//!
//! [`build_auth_service`] is the backend factory: it reads
//! an [`AuthConfig`] and assembles one of the three supported backend
//! pairs behind the same [`AuthService`], so collaborators never see which
//! backend is in play.

use auth_config::{AuthConfig, BackendKind};
use auth_core::prelude::{AuthService, GroupRegistry, TokenService};
use auth_core::storage::{GroupStore, TokenStore};
use auth_core::AuthError;
use auth_crypto::{JwtConfig, JwtService, SigningKey};
use auth_storage::{FileGroupStore, FileTokenStore, MemoryGroupStore, MemoryTokenStore};
use auth_vault::{KvGroupStore, KvTokenStore, VaultAuth, VaultClient, VaultConfig};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

pub use auth_core::prelude::*;
pub use auth_config::{ConfigError, ConfigLoader, ConfigValidator};

/// Builds an [`AuthService`] for the backend named in `config`. Fails fast
/// with [`AuthError::Validation`] or [`AuthError::StorageUnavailable`] on
/// misconfiguration rather than at first use.
pub async fn build_auth_service(config: &AuthConfig) -> Result<AuthService, AuthError> {
    let (token_store, group_store): (Arc<dyn TokenStore>, Arc<dyn GroupStore>) = match config.backend {
        BackendKind::Memory => (
            Arc::new(MemoryTokenStore::new()),
            Arc::new(MemoryGroupStore::new()),
        ),
        BackendKind::File => (
            Arc::new(FileTokenStore::new(config.token_store_path.clone())?),
            Arc::new(FileGroupStore::new(config.group_store_path.clone())?),
        ),
        BackendKind::Vault => {
            let vault_url = config
                .vault_url
                .clone()
                .ok_or_else(|| AuthError::validation("vault backend requires vault_url"))?;
            let auth = if let Some(token) = &config.vault_token {
                VaultAuth::StaticToken(token.expose_secret().clone())
            } else {
                let role_id = config
                    .vault_role_id
                    .clone()
                    .ok_or_else(|| AuthError::validation("vault backend requires vault_role_id or vault_token"))?;
                let secret_id = config
                    .vault_secret_id
                    .as_ref()
                    .ok_or_else(|| AuthError::validation("vault backend requires vault_secret_id or vault_token"))?
                    .expose_secret()
                    .clone();
                VaultAuth::AppRole { role_id, secret_id }
            };
            let client = Arc::new(VaultClient::new(VaultConfig {
                url: vault_url,
                mount_point: config.vault_mount_point.clone(),
                timeout: Duration::from_secs(config.vault_timeout_secs),
                verify_ssl: config.vault_verify_ssl,
                auth,
            })?);
            client.authenticate().await?;
            (
                Arc::new(KvTokenStore::new(Arc::clone(&client), config.vault_path_prefix.clone())),
                Arc::new(KvGroupStore::new(client, config.vault_path_prefix.clone())),
            )
        }
    };

    let groups = Arc::new(GroupRegistry::new(group_store));
    if config.auto_bootstrap {
        groups.ensure_reserved_groups().await?;
    }

    let jwt = build_jwt_service(config)?;
    let tokens = Arc::new(TokenService::new(token_store, Arc::new(jwt)));
    Ok(AuthService::new(groups, tokens))
}

fn build_jwt_service(config: &AuthConfig) -> Result<JwtService, AuthError> {
    let secret = match &config.jwt_secret {
        Some(secret) => secret.expose_secret().clone(),
        // Memory never persists a record past process exit, so a signing
        // key that doesn't survive restarts either is harmless. Every
        // other backend signs credentials meant to outlive the process
        // and must be given an explicit secret.
        None if config.backend == BackendKind::Memory => generate_ephemeral_secret(),
        None => return Err(AuthError::validation("jwt_secret is required")),
    };
    let key = SigningKey::from_secret(&secret).map_err(|e| AuthError::validation(e.to_string()))?;
    Ok(JwtService::new(
        JwtConfig {
            audience: config.jwt_audience.clone(),
            default_ttl: None,
        },
        key,
    ))
}

fn generate_ephemeral_secret() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
