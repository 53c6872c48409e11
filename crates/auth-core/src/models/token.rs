//! Token record and verification result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side token state, keyed by `id`. Never deleted — revocation
/// flips `status` and sets `revoked_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    pub id: Uuid,
    /// Lowercase DNS-like alias, unique among all records, immutable once set.
    pub name: Option<String>,
    /// Ordered, deduplicated group names; must all exist and be active at
    /// creation time.
    pub groups: Vec<String>,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Revoked,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }
}

/// Ephemeral verification result. Lives only in-memory across one call —
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub jti: Uuid,
    pub groups: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}
