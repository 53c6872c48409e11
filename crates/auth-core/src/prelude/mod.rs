//! Re-exports the surface most callers need in one `use auth_core::prelude::*`.

pub use crate::audit::{AuditCategory, AuditEvent, AuditLogger, AuditOutcome, TracingAuditLogger};
pub use crate::error::AuthError;
pub use crate::models::{
    Group, TokenInfo, TokenRecord, TokenStatus, RESERVED_GROUP_NAMES,
};
pub use crate::services::{AuthService, GroupRegistry, TokenService, PUBLIC_GROUP};
pub use crate::storage::{BackendHealth, GroupStore, TokenStore};
