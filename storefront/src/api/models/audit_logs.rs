//! API response models for the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::db::models::audit_logs::AuditLogDBResponse;
use crate::types::AuditLogId;

/// Query parameters for listing audit records
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListAuditLogsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// A recorded state change
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AuditLogId,
    /// What happened, e.g. `order.paid`
    #[schema(example = "order.paid")]
    pub action: String,
    #[schema(example = "order")]
    pub entity_type: String,
    pub entity_id: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogDBResponse> for AuditLogResponse {
    fn from(log: AuditLogDBResponse) -> Self {
        Self {
            id: log.id,
            action: log.action,
            entity_type: log.entity_type,
            entity_id: log.entity_id,
            details: log.details,
            created_at: log.created_at,
        }
    }
}
