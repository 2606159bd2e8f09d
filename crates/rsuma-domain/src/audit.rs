//! Audit events for permission changes.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Emitted once per reconciliation that changed stored state, carrying the
/// final desired scope list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PermissionChangeEvent {
    pub user_id: String,
    pub resource_id: String,
    pub scopes: Vec<String>,
}

/// Receives permission change events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn permissions_changed(&self, event: PermissionChangeEvent);
}

/// Default sink that writes events to the tracing log.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn permissions_changed(&self, event: PermissionChangeEvent) {
        let representation = serde_json::to_string(&event).unwrap_or_default();
        info!(
            user_id = %event.user_id,
            resource_id = %event.resource_id,
            %representation,
            "resource permissions changed"
        );
    }
}
