//! HS256 credential signing and verification.
//!
//! Claims are fixed to exactly the fields the core token service needs:
//! `jti`, `groups`, `iat`, `exp` (optional), `nbf` (= `iat`), `aud`. The
//! record `name` is never embedded here — callers that need it look the
//! record up by `jti`.

use crate::keys::SigningKey;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token encoding failed: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
    #[error("token validation failed: {reason}")]
    ValidationError { reason: String },
    #[error("token expired")]
    TokenExpired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub jti: Uuid,
    pub groups: Vec<String>,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub nbf: i64,
    pub aud: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub audience: String,
    /// Default time-to-live applied when a caller doesn't request one
    /// explicitly. `None` issues a non-expiring credential.
    pub default_ttl: Option<chrono::Duration>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            audience: "auth".to_string(),
            default_ttl: Some(chrono::Duration::hours(1)),
        }
    }
}

pub struct JwtService {
    config: JwtConfig,
    key: SigningKey,
}

impl JwtService {
    pub fn new(config: JwtConfig, key: SigningKey) -> Self {
        Self { config, key }
    }

    /// Signs a credential for `jti` carrying `groups`. `ttl` overrides the
    /// configured default for this one credential; `Some(None)` is not
    /// representable, so pass `self.config.default_ttl` explicitly if the
    /// caller wants the configured default.
    pub fn sign(
        &self,
        jti: Uuid,
        groups: Vec<String>,
        ttl: Option<chrono::Duration>,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = JwtClaims {
            jti,
            groups,
            iat: now.timestamp(),
            exp: ttl.map(|d| (now + d).timestamp()),
            nbf: now.timestamp(),
            aud: self.config.audience.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, self.key.encoding()).map_err(JwtError::EncodingError)
    }

    /// Same as `sign`, but falls back to the configured default TTL.
    pub fn sign_with_default_ttl(
        &self,
        jti: Uuid,
        groups: Vec<String>,
    ) -> Result<String, JwtError> {
        self.sign(jti, groups, self.config.default_ttl)
    }

    /// Verifies signature, audience, and claim shape. Expiry is checked
    /// separately by the caller against `exp`, since `exp` is optional and
    /// `jsonwebtoken`'s built-in check rejects tokens that lack it.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let data = decode::<JwtClaims>(token, self.key.decoding(), &validation).map_err(|e| {
            JwtError::ValidationError {
                reason: e.to_string(),
            }
        })?;

        let claims = data.claims;
        if let Some(exp) = claims.exp {
            if exp < Utc::now().timestamp() {
                return Err(JwtError::TokenExpired);
            }
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(
            JwtConfig {
                audience: "test-aud".into(),
                default_ttl: Some(chrono::Duration::hours(1)),
            },
            SigningKey::from_secret_unchecked(&"s".repeat(32)),
        )
    }

    #[test]
    fn signs_and_verifies_round_trip() {
        let svc = service();
        let jti = Uuid::new_v4();
        let groups = vec!["public".to_string(), "ops".to_string()];

        let token = svc.sign_with_default_ttl(jti, groups.clone()).unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.jti, jti);
        assert_eq!(claims.groups, groups);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp.is_some());
    }

    #[test]
    fn non_expiring_credential_has_no_exp_claim() {
        let svc = service();
        let token = svc.sign(Uuid::new_v4(), vec![], None).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert!(claims.exp.is_none());
    }

    #[test]
    fn expired_credential_is_rejected() {
        let svc = service();
        let token = svc
            .sign(Uuid::new_v4(), vec![], Some(chrono::Duration::seconds(-1)))
            .unwrap();
        let err = svc.verify(&token).unwrap_err();
        assert!(matches!(err, JwtError::TokenExpired));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let svc = service();
        let token = svc.sign_with_default_ttl(Uuid::new_v4(), vec![]).unwrap();

        let other = JwtService::new(
            JwtConfig {
                audience: "other-aud".into(),
                default_ttl: Some(chrono::Duration::hours(1)),
            },
            SigningKey::from_secret_unchecked(&"s".repeat(32)),
        );
        let err = other.verify(&token).unwrap_err();
        assert!(matches!(err, JwtError::ValidationError { .. }));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let svc = service();
        let mut token = svc.sign_with_default_ttl(Uuid::new_v4(), vec![]).unwrap();
        token.push('x');
        let err = svc.verify(&token).unwrap_err();
        assert!(matches!(err, JwtError::ValidationError { .. }));
    }
}
