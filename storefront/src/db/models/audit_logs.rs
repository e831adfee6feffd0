//! Database models for the audit trail.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::AuditLogId;

/// Database row for an audit record
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogDBResponse {
    pub id: AuditLogId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Database request for writing an audit record
#[derive(Debug, Clone)]
pub struct AuditLogCreateDBRequest {
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
}

impl AuditLogCreateDBRequest {
    /// Audit record for a change to an order
    pub fn for_order(action: &str, order_id: crate::types::OrderId, details: serde_json::Value) -> Self {
        Self {
            action: action.to_string(),
            entity_type: "order".to_string(),
            entity_id: order_id.to_string(),
            details,
        }
    }
}
