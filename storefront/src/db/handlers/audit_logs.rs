//! Database repository for the audit trail.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::audit_logs::{AuditLogCreateDBRequest, AuditLogDBResponse},
};

pub struct AuditLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AuditLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(action = %request.action, entity_id = %request.entity_id), err)]
    pub async fn create(&mut self, request: &AuditLogCreateDBRequest) -> Result<AuditLogDBResponse> {
        let log = sqlx::query_as::<_, AuditLogDBResponse>(
            r#"
            INSERT INTO audit_logs (action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&request.action)
        .bind(&request.entity_type)
        .bind(&request.entity_id)
        .bind(&request.details)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(log)
    }

    /// Newest first.
    #[instrument(skip(self), err)]
    pub async fn list(&mut self, skip: i64, limit: i64) -> Result<Vec<AuditLogDBResponse>> {
        let logs = sqlx::query_as::<_, AuditLogDBResponse>("SELECT * FROM audit_logs ORDER BY created_at DESC, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(logs)
    }

    /// Audit records for one entity, oldest first.
    #[instrument(skip(self), err)]
    pub async fn list_for_entity(&mut self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditLogDBResponse>> {
        let logs = sqlx::query_as::<_, AuditLogDBResponse>(
            "SELECT * FROM audit_logs WHERE entity_type = $1 AND entity_id = $2 ORDER BY created_at ASC, id",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(logs)
    }

    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_list(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = AuditLogs::new(&mut conn);

        let created = repo
            .create(&AuditLogCreateDBRequest::for_order("order.paid", 42, json!({"event_id": "evt_1"})))
            .await
            .unwrap();
        assert_eq!(created.entity_type, "order");
        assert_eq!(created.entity_id, "42");
        assert_eq!(created.details["event_id"], "evt_1");

        repo.create(&AuditLogCreateDBRequest::for_order("order.refunded", 7, json!({})))
            .await
            .unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.list(0, 1).await.unwrap().len(), 1);
        assert_eq!(repo.list(0, 10).await.unwrap().len(), 2);

        let for_order = repo.list_for_entity("order", "42").await.unwrap();
        assert_eq!(for_order.len(), 1);
        assert_eq!(for_order[0].action, "order.paid");
    }
}
