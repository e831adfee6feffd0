use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::QueryParams,
        models::{
            audit_logs::{AuditLogResponse, ListAuditLogsQuery},
            pagination::PaginatedResponse,
        },
    },
    auth::store_credentials::StoreCredentials,
    db::handlers::AuditLogs,
    errors::{Error, ErrorBody, Result},
};

#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "audit",
    summary = "List audit records",
    description = "Payment-driven order changes, newest first.",
    params(ListAuditLogsQuery),
    responses(
        (status = 200, description = "Page of audit records", body = PaginatedResponse<AuditLogResponse>),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    _: StoreCredentials,
    QueryParams(query): QueryParams<ListAuditLogsQuery>,
) -> Result<Json<PaginatedResponse<AuditLogResponse>>> {
    let (skip, limit) = query.pagination.params();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = AuditLogs::new(&mut conn);
    let logs = repo.list(skip, limit).await?;
    let total = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        logs.into_iter().map(AuditLogResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use sqlx::PgPool;

    use crate::{
        db::{handlers::AuditLogs, models::audit_logs::AuditLogCreateDBRequest},
        test_utils::*,
    };

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_audit_logs_newest_first(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = AuditLogs::new(&mut conn);
        for order_id in 1..=3 {
            repo.create(&AuditLogCreateDBRequest::for_order("order.paid", order_id, json!({"n": order_id})))
                .await
                .unwrap();
        }

        let response = app.get("/api/v1/audit-logs?limit=2").await;
        response.assert_status_ok();
        let page: Value = response.json();
        assert_eq!(page["total_count"], 3);
        assert_eq!(page["limit"], 2);
        assert_eq!(page["data"].as_array().unwrap().len(), 2);
        assert_eq!(page["data"][0]["entity_id"], "3");
        assert_eq!(page["data"][0]["action"], "order.paid");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_audit_logs_require_credentials_when_configured(pool: PgPool) {
        let mut config = create_test_config();
        config.woocommerce.consumer_key = Some("ck".to_string());
        config.woocommerce.consumer_secret = Some("cs".to_string());
        let app = create_test_app_with_config(pool, config).await;

        app.get("/api/v1/audit-logs").await.assert_status_unauthorized();
        app.get("/api/v1/audit-logs")
            .add_header("authorization", "Basic Y2s6Y3M=")
            .await
            .assert_status_ok();
    }
}
