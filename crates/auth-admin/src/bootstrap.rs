//! Drives a sealed remote store from zero to a working auth system
//!. Every step is written to be safe to re-run: mounts
//! and policies are checked before being created, and per-service
//! credentials are only minted once.

use crate::secrets_dir::SecretsDir;
use auth_core::prelude::{AuthService, GroupRegistry, TokenService};
use auth_core::AuthError;
use auth_crypto::{JwtConfig, JwtService, SigningKey};
use auth_vault::{KvGroupStore, KvTokenStore, VaultAuth, VaultClient, VaultConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct BootstrapConfig {
    pub vault_url: String,
    pub mount_point: String,
    pub path_prefix: String,
    /// Service identities to provision an AppRole for, e.g. `gofr-mcp`.
    pub services: Vec<String>,
    pub secrets_dir: PathBuf,
    pub jwt_audience: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServiceCreds {
    role_id: String,
    secret_id: String,
}

pub struct Bootstrapper {
    config: BootstrapConfig,
    secrets: SecretsDir,
}

impl Bootstrapper {
    pub fn new(config: BootstrapConfig) -> Self {
        let secrets = SecretsDir::new(config.secrets_dir.clone());
        Self { config, secrets }
    }

    /// Runs the full bootstrap sequence, returning a client authenticated
    /// with the root token so callers can continue operating immediately.
    pub async fn run(&self) -> Result<Arc<VaultClient>, AuthError> {
        let client = Arc::new(VaultClient::new(VaultConfig {
            url: self.config.vault_url.clone(),
            mount_point: self.config.mount_point.clone(),
            timeout: Duration::from_secs(30),
            verify_ssl: true,
            auth: VaultAuth::StaticToken(String::new()),
        })?);

        let root_token = self.initialize_and_unseal(&client).await?;
        client.set_session_token(root_token).await;

        client
            .enable_secrets_engine(&self.config.mount_point, "kv")
            .await?;
        client.enable_auth_method("approle", "approle").await?;

        for service in &self.config.services {
            self.provision_service(&client, service).await?;
        }

        self.write_shared_secrets(&client).await?;
        self.seed_reserved_groups_and_admin_token(&client).await?;

        tracing::info!(services = self.config.services.len(), "bootstrap complete");
        Ok(client)
    }

    async fn initialize_and_unseal(&self, client: &VaultClient) -> Result<String, AuthError> {
        let (initialized, _) = client.init_status().await?;

        let (root_token, unseal_key) = if !initialized {
            let (root_token, unseal_key) = client.sys_init(1, 1).await?;
            self.secrets.write("vault_root_token", &root_token)?;
            self.secrets.write("vault_unseal_key", &unseal_key)?;
            (root_token, unseal_key)
        } else {
            let root_token = self
                .secrets
                .read("vault_root_token")?
                .ok_or_else(|| AuthError::storage_unavailable("initialized store but no local root token"))?;
            let unseal_key = self
                .secrets
                .read("vault_unseal_key")?
                .ok_or_else(|| AuthError::storage_unavailable("initialized store but no local unseal key"))?;
            (root_token, unseal_key)
        };

        let (_, sealed) = client.init_status().await?;
        if sealed {
            client.sys_unseal(&unseal_key).await?;
        }

        Ok(root_token)
    }

    async fn provision_service(&self, client: &VaultClient, service: &str) -> Result<(), AuthError> {
        let creds_file = format!("service_creds/{service}.json");
        if self.secrets.read(&creds_file)?.is_some() {
            return Ok(());
        }

        let policy_name = format!("{service}-policy");
        let policy = format!(
            "path \"{mount}/data/{service}-secrets/*\" {{ capabilities = [\"read\"] }}\n\
             path \"{mount}/data/config/*\" {{ capabilities = [\"read\"] }}\n\
             path \"{mount}/data/{prefix}/*\" {{ capabilities = [\"create\", \"read\", \"update\", \"delete\", \"list\"] }}\n",
            mount = self.config.mount_point,
            service = service,
            prefix = self.config.path_prefix,
        );
        client.write_policy(&policy_name, &policy).await?;
        client.write_approle_role(service, &policy_name).await?;

        let role_id = client.read_role_id(service).await?;
        let secret_id = client.generate_secret_id(service).await?;

        let creds = ServiceCreds { role_id, secret_id };
        let json = serde_json::to_string_pretty(&creds)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        self.secrets.write(&creds_file, &json)?;
        Ok(())
    }

    async fn write_shared_secrets(&self, client: &VaultClient) -> Result<(), AuthError> {
        if client.secret_exists("config/jwt-signing-secret").await? {
            return Ok(());
        }
        let secret: String = uuid::Uuid::new_v4().simple().to_string() + &uuid::Uuid::new_v4().simple().to_string();
        let mut data = std::collections::HashMap::new();
        data.insert("value".to_string(), serde_json::Value::String(secret));
        client.write_secret("config/jwt-signing-secret", data).await
    }

    async fn seed_reserved_groups_and_admin_token(&self, client: &Arc<VaultClient>) -> Result<(), AuthError> {
        if self.secrets.read("bootstrap_tokens.json")?.is_some() {
            return Ok(());
        }

        let signing_secret = client
            .read_secret("config/jwt-signing-secret")
            .await?
            .and_then(|m| m.get("value").and_then(|v| v.as_str().map(String::from)))
            .ok_or_else(|| AuthError::storage_unavailable("jwt signing secret missing after write"))?;

        let token_store = Arc::new(KvTokenStore::new(
            Arc::clone(client),
            self.config.path_prefix.clone(),
        ));
        let group_store = Arc::new(KvGroupStore::new(
            Arc::clone(client),
            self.config.path_prefix.clone(),
        ));

        let groups = Arc::new(GroupRegistry::new(group_store));
        groups.ensure_reserved_groups().await?;

        let signing_key = SigningKey::from_secret(&signing_secret)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        let jwt = Arc::new(JwtService::new(
            JwtConfig {
                audience: self.config.jwt_audience.clone(),
                default_ttl: None,
            },
            signing_key,
        ));
        let tokens = Arc::new(TokenService::new(token_store, jwt));
        let auth = AuthService::new(Arc::clone(&groups), tokens);

        let (admin_credential, _) = auth
            .create_token(vec!["admin".to_string()], None, Some("bootstrap-admin".to_string()), None, true)
            .await?;
        let (public_credential, _) = auth
            .create_token(vec![], None, Some("bootstrap-public".to_string()), None, true)
            .await?;

        let payload = serde_json::json!({
            "admin": admin_credential,
            "public": public_credential,
        });
        self.secrets.write(
            "bootstrap_tokens.json",
            &serde_json::to_string_pretty(&payload).map_err(|e| AuthError::storage_unavailable(e.to_string()))?,
        )?;
        Ok(())
    }
}
