//! Database repository for processed payment provider events.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::types::OrderId;

pub struct PaymentEvents<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PaymentEvents<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Claim an event for processing. Returns false when the event was already processed, in
    /// which case nothing should be applied.
    #[instrument(skip(self), err)]
    pub async fn claim(&mut self, event_id: &str, event_type: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Link a claimed event to the order it was applied to.
    #[instrument(skip(self), err)]
    pub async fn set_order(&mut self, event_id: &str, order_id: OrderId) -> Result<()> {
        sqlx::query("UPDATE payment_events SET order_id = $2 WHERE event_id = $1")
            .bind(event_id)
            .bind(order_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_claim_is_idempotent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PaymentEvents::new(&mut conn);

        assert!(repo.claim("evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(!repo.claim("evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(repo.claim("evt_2", "charge.refunded").await.unwrap());
    }
}
