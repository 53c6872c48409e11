//! Configuration loading from environment variables.
//!
//! Each recognized `{PREFIX}_*` variable is pulled out by name and handed
//! to `AuthConfig` explicitly; there is no `try_deserialize()` into the
//! struct, so adding a field here is a deliberate, visible edit rather
//! than an implicit side effect of a rename.

use crate::config::{AuthConfig, BackendKind};
use crate::validation::{ConfigError, ConfigValidator};
use config::{Config, Environment};
use secrecy::Secret;
use std::path::PathBuf;

pub struct ConfigLoader {
    prefix: String,
}

impl ConfigLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Reads `{PREFIX}_*` environment variables, builds an `AuthConfig`,
    /// and validates it before returning.
    pub fn load(&self) -> Result<AuthConfig, ConfigError> {
        let source = Config::builder()
            .add_source(Environment::with_prefix(&self.prefix).try_parsing(true))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let backend_raw = source
            .get_string("auth_backend")
            .unwrap_or_else(|_| "memory".to_string());
        let backend = BackendKind::parse(&backend_raw)
            .ok_or_else(|| ConfigError::Invalid(format!("unrecognized backend '{backend_raw}'")))?;

        let config = AuthConfig {
            backend,
            jwt_secret: source.get_string("jwt_secret").ok().map(Secret::new),
            jwt_audience: source
                .get_string("jwt_audience")
                .unwrap_or_else(|_| "auth".to_string()),
            token_store_path: source
                .get_string("token_store")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/auth/tokens.json")),
            group_store_path: source
                .get_string("group_store")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/auth/groups.json")),
            vault_url: source.get_string("vault_url").ok(),
            vault_token: source.get_string("vault_token").ok().map(Secret::new),
            vault_role_id: source.get_string("vault_role_id").ok(),
            vault_secret_id: source.get_string("vault_secret_id").ok().map(Secret::new),
            vault_mount_point: source
                .get_string("vault_mount_point")
                .unwrap_or_else(|_| "secret".to_string()),
            vault_path_prefix: source
                .get_string("vault_path_prefix")
                .unwrap_or_else(|_| "gofr/auth".to_string()),
            vault_timeout_secs: source
                .get_int("vault_timeout")
                .map(|v| v as u64)
                .unwrap_or(30),
            vault_verify_ssl: source.get_bool("vault_verify_ssl").unwrap_or(true),
            auto_bootstrap: source.get_bool("auto_bootstrap").unwrap_or(true),
        };

        ConfigValidator::validate(&config)?;
        Ok(config)
    }
}
