//! HMAC signing key material. The JWT primitives themselves (HS256
//! sign/verify) are a library concern, not reimplemented here.

use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing secret must be at least {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },
}

/// Minimum secret length enforced before a signing key is constructed.
pub const MIN_SECRET_BYTES: usize = 32;

/// The single shared HMAC-SHA256 secret used to sign and verify every
/// credential this library issues. Rotation replaces the secret wholesale;
/// there is no key ring.
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(KeyError::SecretTooShort {
                min: MIN_SECRET_BYTES,
                actual: secret.len(),
            });
        }
        Ok(Self::from_secret_unchecked(secret))
    }

    /// Skips the length check; used by tests that want a short, readable
    /// secret.
    pub fn from_secret_unchecked(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_secrets() {
        let err = SigningKey::from_secret("too-short").unwrap_err();
        assert!(matches!(err, KeyError::SecretTooShort { .. }));
    }

    #[test]
    fn accepts_secrets_at_the_minimum_length() {
        let secret = "a".repeat(MIN_SECRET_BYTES);
        assert!(SigningKey::from_secret(&secret).is_ok());
    }
}
