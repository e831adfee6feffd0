//! Applying payment events to orders.
//!
//! Every event is handled in one transaction: the event id is claimed in `payment_events`, the
//! order row is locked, the guarded state change is applied together with its stock and audit
//! side effects, and the transaction commits. A redelivered event fails the claim and changes
//! nothing.

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use crate::{
    db::{
        handlers::{AuditLogs, Orders, PaymentEvents, Products},
        models::{audit_logs::AuditLogCreateDBRequest, orders::OrderDBResponse},
    },
    payment_providers::{PaymentEventKind, Result, WebhookEvent},
    types::OrderId,
};

/// What processing an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order changed (or, for partial refunds, an audit record was written)
    Applied { order_id: OrderId, action: &'static str },
    /// The event was processed before
    Duplicate,
    /// The order was found but its state does not allow this event
    Skipped { order_id: OrderId },
    /// No order matches the event
    OrderNotFound,
    /// Event type this service does not act on
    Ignored,
}

/// Find the order an event refers to: the metadata order id first, then the payment intent.
async fn lock_order(conn: &mut PgConnection, event: &WebhookEvent) -> Result<Option<OrderDBResponse>> {
    let mut orders = Orders::new(&mut *conn);

    if let Some(order_id) = event.order_id
        && let Some(order) = orders.lock_by_id(order_id).await?
    {
        return Ok(Some(order));
    }

    if let Some(ref payment_intent_id) = event.payment_intent_id {
        return Ok(orders.lock_by_payment_intent(payment_intent_id).await?);
    }

    Ok(None)
}

#[instrument(skip_all, fields(event_id = %event.id, event_type = %event.event_type), err)]
pub async fn apply_event(db_pool: &PgPool, event: &WebhookEvent) -> Result<WebhookOutcome> {
    if event.kind == PaymentEventKind::Other {
        tracing::debug!("Ignoring webhook event type: {}", event.event_type);
        return Ok(WebhookOutcome::Ignored);
    }

    let mut tx = db_pool.begin().await?;

    if !PaymentEvents::new(&mut tx).claim(&event.id, &event.event_type).await? {
        tracing::info!("Event {} already processed, skipping", event.id);
        return Ok(WebhookOutcome::Duplicate);
    }

    let Some(order) = lock_order(&mut tx, event).await? else {
        tracing::warn!(
            "No order found for event {} (order_id: {:?}, payment_intent: {:?})",
            event.id,
            event.order_id,
            event.payment_intent_id
        );
        tx.commit().await?;
        return Ok(WebhookOutcome::OrderNotFound);
    };

    let outcome = match event.kind {
        PaymentEventKind::PaymentSucceeded => mark_paid(&mut tx, &order, event).await?,
        PaymentEventKind::PaymentFailed => mark_failed(&mut tx, &order, event).await?,
        PaymentEventKind::ChargeRefunded => mark_refunded(&mut tx, &order, event).await?,
        PaymentEventKind::Other => WebhookOutcome::Ignored,
    };

    PaymentEvents::new(&mut tx).set_order(&event.id, order.id).await?;
    tx.commit().await?;

    match &outcome {
        WebhookOutcome::Applied { order_id, action } => tracing::info!("Applied {} to order {}", action, order_id),
        WebhookOutcome::Skipped { order_id } => tracing::info!(
            "Order {} is {} / {}, not applying {}",
            order_id,
            order.status.as_str(),
            order.payment_status.as_str(),
            event.event_type
        ),
        _ => {}
    }

    Ok(outcome)
}

async fn mark_paid(conn: &mut PgConnection, order: &OrderDBResponse, event: &WebhookEvent) -> Result<WebhookOutcome> {
    if !order.accepts_payment() {
        return Ok(WebhookOutcome::Skipped { order_id: order.id });
    }

    let paid = Orders::new(&mut *conn).mark_paid(order.id, event.payment_intent_id.as_deref()).await?;

    let items = Orders::new(&mut *conn).get_items(order.id).await?;
    for item in &items {
        if let Some(product_id) = item.product_id {
            Products::new(&mut *conn).decrement_stock(product_id, item.quantity).await?;
        }
    }

    AuditLogs::new(&mut *conn)
        .create(&AuditLogCreateDBRequest::for_order(
            "order.paid",
            order.id,
            json!({
                "event_id": event.id,
                "payment_intent_id": paid.payment_intent_id,
                "previous_status": order.status,
                "total": paid.total.to_string(),
            }),
        ))
        .await?;

    Ok(WebhookOutcome::Applied {
        order_id: order.id,
        action: "order.paid",
    })
}

async fn mark_failed(conn: &mut PgConnection, order: &OrderDBResponse, event: &WebhookEvent) -> Result<WebhookOutcome> {
    if !order.accepts_payment_failure() {
        return Ok(WebhookOutcome::Skipped { order_id: order.id });
    }

    Orders::new(&mut *conn).mark_payment_failed(order.id).await?;

    AuditLogs::new(&mut *conn)
        .create(&AuditLogCreateDBRequest::for_order(
            "order.payment_failed",
            order.id,
            json!({
                "event_id": event.id,
                "payment_intent_id": event.payment_intent_id,
                "reason": event.failure_message,
            }),
        ))
        .await?;

    Ok(WebhookOutcome::Applied {
        order_id: order.id,
        action: "order.payment_failed",
    })
}

async fn mark_refunded(conn: &mut PgConnection, order: &OrderDBResponse, event: &WebhookEvent) -> Result<WebhookOutcome> {
    if !order.accepts_refund() {
        return Ok(WebhookOutcome::Skipped { order_id: order.id });
    }

    let (charge_id, amount_refunded, fully_refunded) = match &event.refund {
        Some(refund) => (Some(refund.charge_id.as_str()), refund.amount_refunded, refund.fully_refunded),
        None => (None, 0, true),
    };

    let action = if fully_refunded {
        Orders::new(&mut *conn).mark_refunded(order.id).await?;
        "order.refunded"
    } else {
        "order.partially_refunded"
    };

    AuditLogs::new(&mut *conn)
        .create(&AuditLogCreateDBRequest::for_order(
            action,
            order.id,
            json!({
                "event_id": event.id,
                "charge_id": charge_id,
                "amount_refunded": amount_refunded,
            }),
        ))
        .await?;

    Ok(WebhookOutcome::Applied { order_id: order.id, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Repository;
    use crate::db::models::orders::{OrderStatus, PaymentStatus};
    use crate::payment_providers::RefundDetails;
    use crate::test_utils::{create_test_order, create_test_product};

    fn event(id: &str, kind: PaymentEventKind, order_id: Option<OrderId>, payment_intent_id: Option<&str>) -> WebhookEvent {
        let event_type = match kind {
            PaymentEventKind::PaymentSucceeded => "payment_intent.succeeded",
            PaymentEventKind::PaymentFailed => "payment_intent.payment_failed",
            PaymentEventKind::ChargeRefunded => "charge.refunded",
            PaymentEventKind::Other => "customer.created",
        };
        WebhookEvent {
            id: id.to_string(),
            event_type: event_type.to_string(),
            kind,
            order_id,
            payment_intent_id: payment_intent_id.map(str::to_string),
            failure_message: None,
            refund: None,
        }
    }

    fn refund(id: &str, payment_intent_id: &str, fully_refunded: bool) -> WebhookEvent {
        let mut event = event(id, PaymentEventKind::ChargeRefunded, None, Some(payment_intent_id));
        event.refund = Some(RefundDetails {
            charge_id: "ch_1".to_string(),
            amount_refunded: 500,
            fully_refunded,
        });
        event
    }

    async fn audit_actions(pool: &PgPool, order_id: OrderId) -> Vec<String> {
        let mut conn = pool.acquire().await.unwrap();
        AuditLogs::new(&mut conn)
            .list_for_entity("order", &order_id.to_string())
            .await
            .unwrap()
            .into_iter()
            .map(|log| log.action)
            .collect()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_success_marks_order_paid_and_decrements_stock(pool: PgPool) {
        let product = create_test_product(&pool, "mug", Some(5)).await;
        let order = create_test_order(&pool, &[(product.id, 2)], Some("pi_1")).await;

        let outcome = apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, Some(order.id), None))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                order_id: order.id,
                action: "order.paid"
            }
        );

        let mut conn = pool.acquire().await.unwrap();
        let updated = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(updated.status, OrderStatus::Processing);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert!(updated.paid_at.is_some());

        let product = Products::new(&mut conn).get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, Some(3));

        assert_eq!(audit_actions(&pool, order.id).await, vec!["order.paid"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_redelivered_event_is_applied_once(pool: PgPool) {
        let product = create_test_product(&pool, "mug", Some(5)).await;
        let order = create_test_order(&pool, &[(product.id, 2)], Some("pi_1")).await;
        let delivery = event("evt_1", PaymentEventKind::PaymentSucceeded, None, Some("pi_1"));

        apply_event(&pool, &delivery).await.unwrap();
        assert_eq!(apply_event(&pool, &delivery).await.unwrap(), WebhookOutcome::Duplicate);

        let mut conn = pool.acquire().await.unwrap();
        let product = Products::new(&mut conn).get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, Some(3));
        assert_eq!(audit_actions(&pool, order.id).await.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_second_success_event_does_not_decrement_again(pool: PgPool) {
        let product = create_test_product(&pool, "mug", Some(5)).await;
        let order = create_test_order(&pool, &[(product.id, 2)], Some("pi_1")).await;

        apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, None, Some("pi_1")))
            .await
            .unwrap();
        let outcome = apply_event(&pool, &event("evt_2", PaymentEventKind::PaymentSucceeded, None, Some("pi_1")))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Skipped { order_id: order.id });

        let mut conn = pool.acquire().await.unwrap();
        let product = Products::new(&mut conn).get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, Some(3));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failure_then_success_on_same_intent(pool: PgPool) {
        let product = create_test_product(&pool, "mug", None).await;
        let order = create_test_order(&pool, &[(product.id, 1)], Some("pi_1")).await;

        let failed = apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentFailed, None, Some("pi_1")))
            .await
            .unwrap();
        assert_eq!(
            failed,
            WebhookOutcome::Applied {
                order_id: order.id,
                action: "order.payment_failed"
            }
        );

        let mut conn = pool.acquire().await.unwrap();
        let cancelled = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Failed);

        apply_event(&pool, &event("evt_2", PaymentEventKind::PaymentSucceeded, None, Some("pi_1")))
            .await
            .unwrap();
        let paid = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        assert_eq!(audit_actions(&pool, order.id).await, vec!["order.payment_failed", "order.paid"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failure_after_payment_is_skipped(pool: PgPool) {
        let product = create_test_product(&pool, "mug", None).await;
        let order = create_test_order(&pool, &[(product.id, 1)], Some("pi_1")).await;

        apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, None, Some("pi_1")))
            .await
            .unwrap();
        let outcome = apply_event(&pool, &event("evt_2", PaymentEventKind::PaymentFailed, None, Some("pi_1")))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Skipped { order_id: order.id });

        let mut conn = pool.acquire().await.unwrap();
        let still_paid = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(still_paid.payment_status, PaymentStatus::Paid);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_refunds(pool: PgPool) {
        let product = create_test_product(&pool, "mug", None).await;
        let order = create_test_order(&pool, &[(product.id, 1)], Some("pi_1")).await;

        // Refund of an unpaid order changes nothing
        assert_eq!(
            apply_event(&pool, &refund("evt_0", "pi_1", true)).await.unwrap(),
            WebhookOutcome::Skipped { order_id: order.id }
        );

        apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, None, Some("pi_1")))
            .await
            .unwrap();

        let partial = apply_event(&pool, &refund("evt_2", "pi_1", false)).await.unwrap();
        assert_eq!(
            partial,
            WebhookOutcome::Applied {
                order_id: order.id,
                action: "order.partially_refunded"
            }
        );
        let mut conn = pool.acquire().await.unwrap();
        let after_partial = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(after_partial.payment_status, PaymentStatus::Paid);

        apply_event(&pool, &refund("evt_3", "pi_1", true)).await.unwrap();
        let refunded = Orders::new(&mut conn).get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

        assert_eq!(
            audit_actions(&pool, order.id).await,
            vec!["order.paid", "order.partially_refunded", "order.refunded"]
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_order_and_ignored_events(pool: PgPool) {
        let outcome = apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, Some(9_999), Some("pi_nope")))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::OrderNotFound);

        // The delivery is recorded, so a retry is a duplicate
        let outcome = apply_event(&pool, &event("evt_1", PaymentEventKind::PaymentSucceeded, Some(9_999), Some("pi_nope")))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Duplicate);

        let outcome = apply_event(&pool, &event("evt_2", PaymentEventKind::Other, None, None)).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_metadata_order_id_takes_precedence(pool: PgPool) {
        let product = create_test_product(&pool, "mug", None).await;
        let by_metadata = create_test_order(&pool, &[(product.id, 1)], None).await;
        let by_intent = create_test_order(&pool, &[(product.id, 1)], Some("pi_1")).await;

        let outcome = apply_event(
            &pool,
            &event("evt_1", PaymentEventKind::PaymentSucceeded, Some(by_metadata.id), Some("pi_1")),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                order_id: by_metadata.id,
                action: "order.paid"
            }
        );

        let mut conn = pool.acquire().await.unwrap();
        let untouched = Orders::new(&mut conn).get_by_id(by_intent.id).await.unwrap().unwrap();
        assert_eq!(untouched.payment_status, PaymentStatus::Unpaid);
    }
}
