//! Database repository for orders and their line items.

use std::collections::HashMap;

use sqlx::{Connection, PgConnection, QueryBuilder};
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    models::orders::{
        OrderCreateDBRequest, OrderDBResponse, OrderFilter, OrderItemDBResponse, OrderStatus, PaymentStatus, order_total,
    },
};
use crate::types::OrderId;

pub struct Orders<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Orders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert an order and all of its line items atomically. The order total is the sum of the
    /// line totals.
    #[instrument(skip(self, request), fields(items = request.items.len()), err)]
    pub async fn create(&mut self, request: &OrderCreateDBRequest) -> Result<OrderDBResponse> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderDBResponse>(
            r#"
            INSERT INTO orders (
                order_key, status, payment_status, currency, total,
                customer_email, customer_name, shipping_address, payment_intent_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&request.order_key)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Unpaid)
        .bind(&request.currency)
        .bind(order_total(&request.items))
        .bind(&request.customer_email)
        .bind(&request.customer_name)
        .bind(&request.shipping_address)
        .bind(&request.payment_intent_id)
        .fetch_one(&mut *tx)
        .await?;

        for item in &request.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, name, sku, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: OrderId) -> Result<Option<OrderDBResponse>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn get_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemDBResponse>> {
        let items = sqlx::query_as::<_, OrderItemDBResponse>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(items)
    }

    /// Line items for several orders, keyed by order id. Orders without items are absent.
    #[instrument(skip(self, order_ids), fields(count = order_ids.len()), err)]
    pub async fn get_items_bulk(&mut self, order_ids: &[OrderId]) -> Result<HashMap<OrderId, Vec<OrderItemDBResponse>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let items = sqlx::query_as::<_, OrderItemDBResponse>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
            .bind(order_ids)
            .fetch_all(&mut *self.db)
            .await?;

        let mut result: HashMap<OrderId, Vec<OrderItemDBResponse>> = HashMap::new();
        for item in items {
            result.entry(item.order_id).or_default().push(item);
        }

        Ok(result)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &OrderFilter) -> Result<Vec<OrderDBResponse>> {
        let mut query = QueryBuilder::new("SELECT * FROM orders WHERE 1=1");

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let orders = query.build_query_as::<OrderDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(orders)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &OrderFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE 1=1");

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Lock an order row for a payment state change. Must be called inside a transaction.
    #[instrument(skip(self), err)]
    pub async fn lock_by_id(&mut self, id: OrderId) -> Result<Option<OrderDBResponse>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    /// Lock the order created for a payment intent. Must be called inside a transaction.
    #[instrument(skip(self), err)]
    pub async fn lock_by_payment_intent(&mut self, payment_intent_id: &str) -> Result<Option<OrderDBResponse>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT * FROM orders WHERE payment_intent_id = $1 FOR UPDATE")
            .bind(payment_intent_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    /// Record a successful payment. The order keeps its own payment intent id if it has one, and
    /// never takes one already attached to another order.
    #[instrument(skip(self), err)]
    pub async fn mark_paid(&mut self, id: OrderId, payment_intent_id: Option<&str>) -> Result<OrderDBResponse> {
        sqlx::query_as::<_, OrderDBResponse>(
            r#"
            UPDATE orders
            SET status = $2,
                payment_status = $3,
                paid_at = NOW(),
                payment_intent_id = COALESCE(
                    payment_intent_id,
                    (SELECT $4::text WHERE NOT EXISTS (SELECT 1 FROM orders o WHERE o.payment_intent_id = $4::text))
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Processing)
        .bind(PaymentStatus::Paid)
        .bind(payment_intent_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    pub async fn mark_payment_failed(&mut self, id: OrderId) -> Result<OrderDBResponse> {
        self.set_statuses(id, OrderStatus::Cancelled, PaymentStatus::Failed).await
    }

    #[instrument(skip(self), err)]
    pub async fn mark_refunded(&mut self, id: OrderId) -> Result<OrderDBResponse> {
        self.set_statuses(id, OrderStatus::Refunded, PaymentStatus::Refunded).await
    }

    async fn set_statuses(&mut self, id: OrderId, status: OrderStatus, payment_status: PaymentStatus) -> Result<OrderDBResponse> {
        sqlx::query_as::<_, OrderDBResponse>(
            "UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)
    }
}
