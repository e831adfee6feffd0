//! Stripe webhook provider.
//!
//! Deliveries carry a `Stripe-Signature` header of the form `t=<unix seconds>,v1=<hex>[,v1=...]`.
//! Each `v1` value is a hex encoded HMAC-SHA256 of `"{t}.{raw body}"` keyed with the endpoint's
//! `whsec_` secret. A delivery is accepted when any `v1` entry matches and `t` is within the
//! configured tolerance of the current time.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    config::StripeConfig,
    crypto::constant_time_eq,
    payment_providers::{PaymentError, PaymentEventKind, PaymentProvider, RefundDetails, Result, WebhookEvent},
    types::OrderId,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub struct StripeProvider {
    webhook_secret: String,
    tolerance: Duration,
}

impl From<StripeConfig> for StripeProvider {
    fn from(config: StripeConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret,
            tolerance: config.tolerance,
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .ok_or_else(|| {
                tracing::warn!("Missing stripe-signature header");
                PaymentError::InvalidSignature("Missing stripe-signature header".to_string())
            })?
            .to_str()
            .map_err(|e| {
                tracing::warn!("Invalid stripe-signature header: {:?}", e);
                PaymentError::InvalidSignature("Invalid stripe-signature header".to_string())
            })?;

        verify_signature(signature, body, &self.webhook_secret, self.tolerance, Utc::now().timestamp())?;

        let event = parse_event(body)?;
        tracing::trace!("Validated Stripe webhook event {} ({})", event.id, event.event_type);
        Ok(event)
    }
}

/// Hex encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for a payload.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &str) -> Option<String> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Some(format!("t={timestamp},v1={signature}"))
}

/// Split a `Stripe-Signature` header into its timestamp and `v1` signatures. Unknown schemes
/// (such as `v0`) are skipped.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|_| PaymentError::InvalidSignature("Malformed timestamp in stripe-signature header".to_string()))?;
                timestamp = Some(t);
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::InvalidSignature("No timestamp in stripe-signature header".to_string()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("No v1 signature in stripe-signature header".to_string()));
    }

    Ok((timestamp, signatures))
}

/// Verify a `Stripe-Signature` header against the raw body.
pub fn verify_signature(header: &str, payload: &str, secret: &str, tolerance: Duration, now: i64) -> Result<()> {
    let (timestamp, signatures) = parse_signature_header(header)?;

    let expected = compute_signature(secret, timestamp, payload)
        .ok_or_else(|| PaymentError::InvalidSignature("Unusable webhook secret".to_string()))?;
    let matched = signatures
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()));
    if !matched {
        return Err(PaymentError::InvalidSignature(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if (now - timestamp).abs() > tolerance {
        return Err(PaymentError::InvalidSignature("Timestamp outside the tolerance zone".to_string()));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    type_: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    id: String,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    refunded: bool,
    #[serde(default)]
    amount_refunded: i64,
}

fn metadata_order_id(metadata: &HashMap<String, String>) -> Option<OrderId> {
    let raw = metadata.get("order_id")?;
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!("Ignoring non-numeric order_id in payment metadata: {}", raw);
            None
        }
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| PaymentError::InvalidData(format!("Unexpected {} payload: {}", event.type_, e)))
}

/// Parse a Stripe event body into a [`WebhookEvent`]. Does not check signatures.
pub(crate) fn parse_event(body: &str) -> Result<WebhookEvent> {
    let event: StripeEvent =
        serde_json::from_str(body).map_err(|e| PaymentError::InvalidData(format!("Malformed webhook body: {e}")))?;

    let mut parsed = WebhookEvent {
        id: event.id.clone(),
        event_type: event.type_.clone(),
        kind: PaymentEventKind::Other,
        order_id: None,
        payment_intent_id: None,
        failure_message: None,
        refund: None,
    };

    match event.type_.as_str() {
        "payment_intent.succeeded" | "payment_intent.payment_failed" => {
            let intent: PaymentIntentObject = parse_object(&event)?;
            parsed.kind = if event.type_ == "payment_intent.succeeded" {
                PaymentEventKind::PaymentSucceeded
            } else {
                PaymentEventKind::PaymentFailed
            };
            parsed.order_id = metadata_order_id(&intent.metadata);
            parsed.failure_message = intent.last_payment_error.and_then(|e| e.message);
            parsed.payment_intent_id = Some(intent.id);
        }
        "charge.refunded" => {
            let charge: ChargeObject = parse_object(&event)?;
            parsed.kind = PaymentEventKind::ChargeRefunded;
            parsed.order_id = metadata_order_id(&charge.metadata);
            parsed.payment_intent_id = charge.payment_intent;
            parsed.refund = Some(RefundDetails {
                charge_id: charge.id,
                amount_refunded: charge.amount_refunded,
                fully_refunded: charge.refunded,
            });
        }
        _ => {}
    }

    Ok(parsed)
}
