//! Thin client over a KV-v2-style remote secret store.
//! Speaks the HashiCorp Vault KV v2 HTTP API: `data/` for current
//! versions, `metadata/` for listing and soft-delete, `destroy/` for
//! hard-delete.

use auth_core::resilience::{retry, RetryConfig};
use auth_core::AuthError;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub enum VaultAuth {
    StaticToken(String),
    AppRole { role_id: String, secret_id: String },
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub url: String,
    pub mount_point: String,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub auth: VaultAuth,
}

/// Holds the current session token behind an async `RwLock`: reads take
/// the read-lock, `authenticate`/`reconnect` take the write-lock.
pub struct VaultClient {
    http: Client,
    config: VaultConfig,
    token: RwLock<Option<String>>,
}

impl VaultClient {
    pub fn new(config: VaultConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub async fn authenticate(&self) -> Result<(), AuthError> {
        let token = match &self.config.auth {
            VaultAuth::StaticToken(t) => t.clone(),
            VaultAuth::AppRole { role_id, secret_id } => {
                self.approle_login(role_id, secret_id).await?.0
            }
        };
        *self.token.write().await = Some(token);
        tracing::debug!(mount = %self.config.mount_point, "vault client authenticated");
        Ok(())
    }

    /// Logs in with a role-id/secret-id pair supplied at call time, rather
    /// than the one fixed in `VaultConfig` at construction. Used by the
    /// identity agent, which reads its credentials file fresh on every
    /// login in case the secret-id has been rotated. Returns the session
    /// token's lease duration in seconds.
    pub async fn reauthenticate_with_approle(
        &self,
        role_id: &str,
        secret_id: &str,
    ) -> Result<u64, AuthError> {
        let (token, ttl) = self.approle_login(role_id, secret_id).await?;
        *self.token.write().await = Some(token);
        Ok(ttl)
    }

    async fn approle_login(&self, role_id: &str, secret_id: &str) -> Result<(String, u64), AuthError> {
        let url = format!("{}/v1/auth/approle/login", self.config.url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({"role_id": role_id, "secret_id": secret_id}))
            .send()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AuthError::storage_unavailable(format!(
                "approle login failed: {}",
                resp.status()
            )));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        let token = body["auth"]["client_token"]
            .as_str()
            .ok_or_else(|| AuthError::storage_unavailable("missing client_token in approle response"))?
            .to_string();
        let ttl = body["auth"]["lease_duration"].as_u64().unwrap_or(3600);
        Ok((token, ttl))
    }

    /// Re-runs authentication against a fresh connection; used when a
    /// caller suspects the current session token has gone stale.
    pub async fn reconnect(&self) -> Result<(), AuthError> {
        self.authenticate().await
    }

    /// Renews the current session token in place (`auth/token/renew-self`),
    /// distinct from a full relogin. Returns the renewed TTL in seconds.
    pub async fn renew_self(&self) -> Result<u64, AuthError> {
        let token = self.token_header().await?;
        let body = self
            .sys_request(Method::POST, "auth/token/renew-self", None, Some(&token))
            .await?;
        Ok(body["auth"]["lease_duration"].as_u64().unwrap_or(0))
    }

    /// Injects a session token directly, bypassing `authenticate()`. Used
    /// by the bootstrap flow, which obtains a root token from `sys/init`
    /// before any AppRole identity exists.
    pub async fn set_session_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Retries a KV operation against the configured `RetryConfig` default.
    /// Used for the data-plane reads/writes a caller is actively waiting
    /// on; sys-level bootstrap calls are one-shot by design and don't go
    /// through this.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, AuthError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AuthError>>,
    {
        retry(RetryConfig::default(), op).await
    }

    async fn token_header(&self) -> Result<String, AuthError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::storage_unavailable("vault client not authenticated"))
    }

    fn data_url(&self, path: &str) -> String {
        format!("{}/v1/{}/data/{}", self.config.url, self.config.mount_point, path)
    }

    fn metadata_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}/metadata/{}",
            self.config.url, self.config.mount_point, path
        )
    }

    fn destroy_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}/destroy/{}",
            self.config.url, self.config.mount_point, path
        )
    }

    pub async fn read_secret(
        &self,
        path: &str,
    ) -> Result<Option<HashMap<String, Value>>, AuthError> {
        let token = self.token_header().await?;
        self.with_retry(|| async {
            let resp = self
                .http
                .get(self.data_url(path))
                .header("X-Vault-Token", token.as_str())
                .send()
                .await
                .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;

            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(AuthError::storage_unavailable(format!(
                    "read_secret {path}: {}",
                    resp.status()
                )));
            }
            let body: Value = resp
                .json()
                .await
                .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
            Ok(body["data"]["data"].as_object().map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            }))
        })
        .await
    }

    /// Creates-or-overwrites a new version.
    pub async fn write_secret(
        &self,
        path: &str,
        data: HashMap<String, Value>,
    ) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        self.with_retry(|| async {
            let resp = self
                .http
                .post(self.data_url(path))
                .header("X-Vault-Token", token.as_str())
                .json(&serde_json::json!({ "data": &data }))
                .send()
                .await
                .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(AuthError::storage_unavailable(format!(
                    "write_secret {path}: {}",
                    resp.status()
                )));
            }
            Ok(())
        })
        .await
    }

    /// `hard=false` marks all versions deleted (recoverable via undelete);
    /// `hard=true` destroys versions and metadata irrecoverably.
    pub async fn delete_secret(&self, path: &str, hard: bool) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        self.with_retry(|| async {
            let resp = if hard {
                self.http
                    .post(self.destroy_url(path))
                    .header("X-Vault-Token", token.as_str())
                    .json(&serde_json::json!({ "versions": [1] }))
                    .send()
                    .await
            } else {
                self.http
                    .delete(self.data_url(path))
                    .header("X-Vault-Token", token.as_str())
                    .send()
                    .await
            }
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;

            if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
                return Err(AuthError::storage_unavailable(format!(
                    "delete_secret {path}: {}",
                    resp.status()
                )));
            }
            Ok(())
        })
        .await
    }

    /// Lists direct children (paths ending `/`) of `path`.
    pub async fn list_secrets(&self, path: &str) -> Result<Vec<String>, AuthError> {
        let token = self.token_header().await?;
        self.with_retry(|| async {
            let resp = self
                .http
                .request(
                    Method::from_bytes(b"LIST").expect("LIST is a valid method token"),
                    self.metadata_url(path),
                )
                .header("X-Vault-Token", token.as_str())
                .send()
                .await
                .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;

            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            if !resp.status().is_success() {
                return Err(AuthError::storage_unavailable(format!(
                    "list_secrets {path}: {}",
                    resp.status()
                )));
            }
            let body: Value = resp
                .json()
                .await
                .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
            Ok(body["data"]["keys"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    pub async fn secret_exists(&self, path: &str) -> Result<bool, AuthError> {
        Ok(self.read_secret(path).await?.is_some())
    }

    /// True iff the server is reachable, initialized, and unsealed.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/v1/sys/health", self.config.url);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success() || resp.status().as_u16() == 429,
            Err(e) => {
                tracing::warn!(error = %e, "vault health check failed");
                false
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Raw `X-Vault-Token`-free request against `/v1/sys/*`, used by the
    /// bootstrap flow before a session token exists.
    async fn sys_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Result<Value, AuthError> {
        let url = format!("{}/v1/{}", self.config.url, path);
        let mut req = self.http.request(method, url);
        if let Some(t) = token {
            req = req.header("X-Vault-Token", t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AuthError::storage_unavailable(format!(
                "sys request {path}: {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))
    }

    /// `(initialized, sealed)` from `/v1/sys/health`.
    pub async fn init_status(&self) -> Result<(bool, bool), AuthError> {
        let url = format!("{}/v1/sys/health", self.config.url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        let initialized = body["initialized"].as_bool().unwrap_or(false);
        let sealed = body["sealed"].as_bool().unwrap_or(true);
        Ok((initialized, sealed))
    }

    /// Generates root key shares and an initial root token. Only valid
    /// against an uninitialized store.
    pub async fn sys_init(&self, secret_shares: u8, secret_threshold: u8) -> Result<(String, String), AuthError> {
        let body = self
            .sys_request(
                Method::POST,
                "sys/init",
                Some(serde_json::json!({
                    "secret_shares": secret_shares,
                    "secret_threshold": secret_threshold,
                })),
                None,
            )
            .await?;
        let root_token = body["root_token"]
            .as_str()
            .ok_or_else(|| AuthError::storage_unavailable("sys/init: missing root_token"))?
            .to_string();
        let unseal_key = body["keys"][0]
            .as_str()
            .ok_or_else(|| AuthError::storage_unavailable("sys/init: missing unseal key"))?
            .to_string();
        Ok((root_token, unseal_key))
    }

    pub async fn sys_unseal(&self, unseal_key: &str) -> Result<bool, AuthError> {
        let body = self
            .sys_request(
                Method::POST,
                "sys/unseal",
                Some(serde_json::json!({ "key": unseal_key })),
                None,
            )
            .await?;
        Ok(!body["sealed"].as_bool().unwrap_or(true))
    }

    /// Enables a secrets engine at `path` if not already mounted.
    pub async fn enable_secrets_engine(&self, path: &str, engine_type: &str) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        let mounts = self
            .sys_request(Method::GET, "sys/mounts", None, Some(&token))
            .await?;
        if mounts.get(format!("{path}/")).is_some() {
            return Ok(());
        }
        self.sys_request(
            Method::POST,
            &format!("sys/mounts/{path}"),
            Some(serde_json::json!({ "type": engine_type, "options": {"version": "2"} })),
            Some(&token),
        )
        .await?;
        Ok(())
    }

    /// Enables an auth method at `path` if not already enabled.
    pub async fn enable_auth_method(&self, path: &str, method_type: &str) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        let methods = self
            .sys_request(Method::GET, "sys/auth", None, Some(&token))
            .await?;
        if methods.get(format!("{path}/")).is_some() {
            return Ok(());
        }
        self.sys_request(
            Method::POST,
            &format!("sys/auth/{path}"),
            Some(serde_json::json!({ "type": method_type })),
            Some(&token),
        )
        .await?;
        Ok(())
    }

    pub async fn write_policy(&self, name: &str, policy_hcl: &str) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        self.sys_request(
            Method::PUT,
            &format!("sys/policies/acl/{name}"),
            Some(serde_json::json!({ "policy": policy_hcl })),
            Some(&token),
        )
        .await?;
        Ok(())
    }

    /// Creates or updates an AppRole role bound to `policy_name`.
    pub async fn write_approle_role(&self, role_name: &str, policy_name: &str) -> Result<(), AuthError> {
        let token = self.token_header().await?;
        self.sys_request(
            Method::POST,
            &format!("auth/approle/role/{role_name}"),
            Some(serde_json::json!({ "token_policies": [policy_name] })),
            Some(&token),
        )
        .await?;
        Ok(())
    }

    pub async fn read_role_id(&self, role_name: &str) -> Result<String, AuthError> {
        let token = self.token_header().await?;
        let body = self
            .sys_request(
                Method::GET,
                &format!("auth/approle/role/{role_name}/role-id"),
                None,
                Some(&token),
            )
            .await?;
        body["data"]["role_id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AuthError::storage_unavailable("missing role_id in response"))
    }

    /// Issues a fresh secret-id; rotation re-runs just this call.
    pub async fn generate_secret_id(&self, role_name: &str) -> Result<String, AuthError> {
        let token = self.token_header().await?;
        let body = self
            .sys_request(
                Method::POST,
                &format!("auth/approle/role/{role_name}/secret-id"),
                None,
                Some(&token),
            )
            .await?;
        body["data"]["secret_id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AuthError::storage_unavailable("missing secret_id in response"))
    }
}
