//! HTTP handler for payment provider webhooks.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    AppState,
    errors::Error,
    payment_providers::{PaymentError, WebhookOutcome},
};

/// Acknowledgement returned to the payment provider
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

fn rejection(error: &PaymentError) -> Response {
    let status = StatusCode::from(error);
    let message = match error {
        PaymentError::Database(_) => "Internal server error".to_string(),
        other => other.to_string(),
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Stripe webhook endpoint.
///
/// Verifies the `Stripe-Signature` header, then applies the event to its order. Duplicate
/// deliveries, unknown orders and event types this service does not act on are all acknowledged
/// with 200 so Stripe stops retrying them.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    tag = "payments",
    summary = "Stripe webhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<timestamp>,v1=<signature>")),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Invalid signature or malformed event"),
        (status = 500, description = "Event could not be applied"),
        (status = 501, description = "No payment provider configured"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let Some(provider) = state.payment_provider.as_ref() else {
        tracing::warn!("Payment webhook called but no payment provider is configured");
        return Error::NotImplemented {
            message: "Payment processing is not configured".to_string(),
        }
        .into_response();
    };

    let event = match provider.validate_webhook(&headers, &body).await {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Rejected {} webhook: {}", provider.name(), e);
            return rejection(&e);
        }
    };

    tracing::info!("Received {} webhook event {} ({})", provider.name(), event.id, event.event_type);

    match provider.process_webhook_event(&state.db, &event).await {
        Ok(outcome) => {
            if outcome == WebhookOutcome::OrderNotFound {
                tracing::warn!("Acknowledging event {} with no matching order", event.id);
            }
            (StatusCode::OK, Json(WebhookAck { received: true })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to process webhook event {}: {}", event.id, e);
            rejection(&e)
        }
    }
}
