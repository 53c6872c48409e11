//! Fail-fast validation of an assembled `AuthConfig`.

use crate::config::{AuthConfig, BackendKind};
use secrecy::ExposeSecret;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AuthConfig) -> Result<(), ConfigError> {
        if config.jwt_audience.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_audience must not be empty".to_string()));
        }

        match config.backend {
            BackendKind::Memory => {}
            BackendKind::File => {
                if config.token_store_path.as_os_str().is_empty()
                    || config.group_store_path.as_os_str().is_empty()
                {
                    return Err(ConfigError::Invalid(
                        "file backend requires both token_store and group_store paths".to_string(),
                    ));
                }
            }
            BackendKind::Vault => {
                if config.vault_url.as_deref().unwrap_or_default().trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "vault backend requires vault_url".to_string(),
                    ));
                }
                let has_token = config.vault_token.is_some();
                let has_approle = config.vault_role_id.is_some() && config.vault_secret_id.is_some();
                if !has_token && !has_approle {
                    return Err(ConfigError::Invalid(
                        "vault backend requires either vault_token or both vault_role_id and vault_secret_id"
                            .to_string(),
                    ));
                }
            }
        }

        if !matches!(config.backend, BackendKind::Memory) {
            match &config.jwt_secret {
                None => {
                    return Err(ConfigError::Invalid("jwt_secret is required".to_string()));
                }
                Some(secret) => {
                    let len = secret.expose_secret().len();
                    if len < auth_crypto::MIN_SECRET_BYTES {
                        return Err(ConfigError::Invalid(format!(
                            "jwt_secret must be at least {} bytes, got {len}",
                            auth_crypto::MIN_SECRET_BYTES
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_does_not_require_a_jwt_secret() {
        let mut config = AuthConfig::for_tests();
        config.jwt_secret = None;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn file_backend_requires_non_empty_paths() {
        let mut config = AuthConfig::for_tests();
        config.backend = BackendKind::File;
        config.token_store_path = "".into();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn vault_backend_requires_a_url_and_credentials() {
        let mut config = AuthConfig::for_tests();
        config.backend = BackendKind::Vault;
        assert!(ConfigValidator::validate(&config).is_err());

        config.vault_url = Some("https://vault.internal:8200".to_string());
        assert!(ConfigValidator::validate(&config).is_err());

        config.vault_token = Some(secrecy::Secret::new("t".repeat(10)));
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn non_memory_backend_rejects_short_jwt_secrets() {
        let mut config = AuthConfig::for_tests();
        config.backend = BackendKind::File;
        config.jwt_secret = Some(secrecy::Secret::new("too-short".to_string()));
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn empty_audience_is_rejected() {
        let mut config = AuthConfig::for_tests();
        config.jwt_audience = "  ".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
