//! Core configuration structure. Every field maps to exactly
//! one `{PREFIX}_*` environment variable; there is no nested reflection.

use secrecy::Secret;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
    Vault,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            "vault" => Some(Self::Vault),
            _ => None,
        }
    }
}

pub struct AuthConfig {
    pub backend: BackendKind,
    pub jwt_secret: Option<Secret<String>>,
    pub jwt_audience: String,
    pub token_store_path: PathBuf,
    pub group_store_path: PathBuf,
    pub vault_url: Option<String>,
    pub vault_token: Option<Secret<String>>,
    pub vault_role_id: Option<String>,
    pub vault_secret_id: Option<Secret<String>>,
    pub vault_mount_point: String,
    pub vault_path_prefix: String,
    pub vault_timeout_secs: u64,
    pub vault_verify_ssl: bool,
    /// Whether a freshly constructed `GroupRegistry` should create the
    /// reserved groups on first use.
    pub auto_bootstrap: bool,
}

impl AuthConfig {
    /// A memory-backed configuration suitable for tests and ephemeral
    /// deployment modes; never valid for a `vault` backend.
    pub fn for_tests() -> Self {
        Self {
            backend: BackendKind::Memory,
            jwt_secret: Some(Secret::new("s".repeat(32))),
            jwt_audience: "test".to_string(),
            token_store_path: PathBuf::from("data/auth/tokens.json"),
            group_store_path: PathBuf::from("data/auth/groups.json"),
            vault_url: None,
            vault_token: None,
            vault_role_id: None,
            vault_secret_id: None,
            vault_mount_point: "secret".to_string(),
            vault_path_prefix: "gofr/auth".to_string(),
            vault_timeout_secs: 30,
            vault_verify_ssl: true,
            auto_bootstrap: true,
        }
    }
}
