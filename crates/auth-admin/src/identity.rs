//! Runtime credentials holder for long-running services.
//!
//! ```text
//!  UNAUTHENTICATED ── login() ──▶ AUTHENTICATED
//!          ▲                           │
//!          │       renew failure       │  renew success
//!          │      (after retries)      ▼
//!          └──────── NEEDS_RELOGIN ◀── AUTHENTICATED
//! ```

use auth_core::AuthError;
use auth_vault::{VaultAuth, VaultClient, VaultConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Unauthenticated,
    Authenticated,
    NeedsRelogin,
}

impl IdentityState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Authenticated,
            2 => Self::NeedsRelogin,
            _ => Self::Unauthenticated,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Unauthenticated => 0,
            Self::Authenticated => 1,
            Self::NeedsRelogin => 2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceCreds {
    role_id: String,
    secret_id: String,
}

/// Exponential backoff steps applied to a renewal retry: 1s then 4s.
const RENEW_RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(4)];

pub struct IdentityAgent {
    creds_path: PathBuf,
    client: Arc<VaultClient>,
    state: Arc<AtomicU8>,
    renewal_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl IdentityAgent {
    pub fn new(creds_path: PathBuf, vault_url: String, mount_point: String) -> Result<Self, AuthError> {
        let client = Arc::new(VaultClient::new(VaultConfig {
            url: vault_url,
            mount_point,
            timeout: Duration::from_secs(30),
            verify_ssl: true,
            auth: VaultAuth::StaticToken(String::new()),
        })?);
        Ok(Self {
            creds_path,
            client,
            state: Arc::new(AtomicU8::new(IdentityState::Unauthenticated.as_u8())),
            renewal_task: std::sync::Mutex::new(None),
        })
    }

    pub fn state(&self) -> IdentityState {
        IdentityState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn read_creds(&self) -> Result<(String, String), AuthError> {
        let contents = std::fs::read_to_string(&self.creds_path).map_err(|e| {
            AuthError::storage_unavailable(format!("reading {}: {e}", self.creds_path.display()))
        })?;
        let creds: ServiceCreds = serde_json::from_str(&contents)
            .map_err(|e| AuthError::storage_unavailable(e.to_string()))?;
        Ok((creds.role_id, creds.secret_id))
    }

    /// Exchanges the role-id/secret-id pair for a session token. Returns
    /// its lease duration, the `ttl` `start_renewal` expects.
    pub async fn login(&self) -> Result<Duration, AuthError> {
        let (role_id, secret_id) = self.read_creds()?;
        let ttl_secs = self
            .client
            .reauthenticate_with_approle(&role_id, &secret_id)
            .await?;
        self.state.store(IdentityState::Authenticated.as_u8(), Ordering::SeqCst);
        Ok(Duration::from_secs(ttl_secs))
    }

    /// Spawns the background renewal loop. `ttl` is the session token's
    /// lifetime in seconds, as returned alongside the session token by the
    /// login call; the loop sleeps for `ttl * 0.75` before renewing.
    pub fn start_renewal(self: &Arc<Self>, ttl: Duration) {
        let agent = Arc::clone(self);
        let sleep_for = ttl.mul_f64(0.75);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(sleep_for).await;
                if agent.state() != IdentityState::Authenticated {
                    return;
                }

                let mut renewed = agent.client.renew_self().await.is_ok();
                if !renewed {
                    for delay in RENEW_RETRY_DELAYS {
                        tokio::time::sleep(delay).await;
                        if agent.client.renew_self().await.is_ok() {
                            renewed = true;
                            break;
                        }
                    }
                }

                if !renewed {
                    tracing::warn!("session renewal failed after retries, needs relogin");
                    agent
                        .state
                        .store(IdentityState::NeedsRelogin.as_u8(), Ordering::SeqCst);
                    return;
                }
            }
        });
        *self.renewal_task.lock().expect("renewal task lock poisoned") = Some(handle);
    }

    /// Returns a client whose session token header is always current,
    /// re-logging in first if renewal previously failed.
    pub async fn get_client(&self) -> Result<Arc<VaultClient>, AuthError> {
        if self.state() == IdentityState::NeedsRelogin || self.state() == IdentityState::Unauthenticated {
            self.login().await?;
        }
        Ok(Arc::clone(&self.client))
    }

    pub fn stop(&self) {
        if let Some(handle) = self.renewal_task.lock().expect("renewal task lock poisoned").take() {
            handle.abort();
        }
        self.state.store(IdentityState::Unauthenticated.as_u8(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_starts_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let creds_path = dir.path().join("creds.json");
        let agent = IdentityAgent::new(
            creds_path,
            "https://vault.internal:8200".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        assert_eq!(agent.state(), IdentityState::Unauthenticated);
    }

    #[test]
    fn read_creds_parses_role_id_and_secret_id() {
        let dir = tempfile::tempdir().unwrap();
        let creds_path = dir.path().join("creds.json");
        std::fs::write(&creds_path, r#"{"role_id":"r-1","secret_id":"s-1"}"#).unwrap();

        let agent = IdentityAgent::new(
            creds_path,
            "https://vault.internal:8200".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        let (role_id, secret_id) = agent.read_creds().unwrap();
        assert_eq!(role_id, "r-1");
        assert_eq!(secret_id, "s-1");
    }

    #[test]
    fn missing_creds_file_surfaces_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let agent = IdentityAgent::new(
            dir.path().join("missing.json"),
            "https://vault.internal:8200".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        assert!(agent.read_creds().is_err());
    }
}
