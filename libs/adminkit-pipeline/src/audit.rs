//! Audit trail of completed operations.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::callback::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub phase: Phase,
    pub entity: String,
    pub principal_id: Uuid,
    pub active_org_id: Uuid,
    /// Rows returned by a query, rows affected otherwise.
    pub rows: u64,
}

/// Receives one event per operation that reached the `adminkit:audit`
/// callback. Sinks must not fail the operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Emits audit events as `info` logs on the `adminkit::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "adminkit::audit",
            phase = %event.phase,
            entity = %event.entity,
            principal_id = %event.principal_id,
            active_org_id = %event.active_org_id,
            rows = event.rows,
            "operation audited"
        );
    }
}
