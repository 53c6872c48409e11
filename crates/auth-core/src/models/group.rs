//! Group (permission scope) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Names that are created by bootstrap and protected from removal.
pub const RESERVED_GROUP_NAMES: [&str; 2] = ["public", "admin"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: Uuid,
    /// Non-empty, lowercase-normalized, globally unique among active groups.
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub defunct_at: Option<DateTime<Utc>>,
    pub is_reserved: bool,
}

impl Group {
    pub fn new(name: String, description: Option<String>, is_reserved: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            is_active: true,
            created_at: Utc::now(),
            defunct_at: None,
            is_reserved,
        }
    }

    pub fn is_reserved_name(name: &str) -> bool {
        RESERVED_GROUP_NAMES.contains(&name)
    }
}
