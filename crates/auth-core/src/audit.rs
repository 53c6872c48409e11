//! Structured audit logging for token and group lifecycle transitions.
//!
//! `AuditLogger` is a trait so a host application can swap in a
//! persistent sink later; `TracingAuditLogger` is the default, emitting
//! structured `tracing` events.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Token,
    Group,
    Admin,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub category: AuditCategory,
    pub action: String,
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
}

impl AuditEvent {
    pub fn new(category: AuditCategory, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            action: action.into(),
            resource_id: None,
            outcome: AuditOutcome::Success,
        }
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn failure(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Failure {
            reason: reason.into(),
        };
        self
    }
}

#[async_trait::async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, event: AuditEvent);
}

/// Logs through `tracing` under the `audit` target so events can be
/// filtered or routed separately from ordinary application logs.
pub struct TracingAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            event_id = %event.id,
            category = ?event.category,
            action = %event.action,
            resource_id = ?event.resource_id,
            outcome = ?event.outcome,
            "audit_event"
        );
    }
}

/// No-op sink for tests that don't care about audit output.
pub struct NullAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for NullAuditLogger {
    async fn log(&self, _event: AuditEvent) {}
}
