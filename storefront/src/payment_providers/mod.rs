//! Payment provider abstraction layer
//!
//! A [`PaymentProvider`] authenticates incoming webhook deliveries and turns them into
//! provider-neutral [`WebhookEvent`]s. Applying an event to an order is shared by every provider
//! and lives in [`fulfillment`].

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;

use crate::{config::PaymentConfig, db::errors::DbError, types::OrderId};

pub mod dummy;
pub mod fulfillment;
pub mod stripe;

pub use fulfillment::WebhookOutcome;

/// Create a payment provider from configuration
pub fn create_provider(config: PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => Box::new(stripe::StripeProvider::from(stripe_config)),
        PaymentConfig::Dummy => Box::new(dummy::DummyProvider),
    }
}

/// Result type for payment provider operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Errors that can occur during webhook handling
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(err: sqlx::Error) -> Self {
        PaymentError::Database(DbError::from(err))
    }
}

impl From<&PaymentError> for StatusCode {
    fn from(err: &PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature(_) | PaymentError::InvalidData(_) => StatusCode::BAD_REQUEST,
            PaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What a webhook event means for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
    PaymentSucceeded,
    PaymentFailed,
    ChargeRefunded,
    /// Any event this service does not act on
    Other,
}

/// Refund details carried by a charge event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundDetails {
    pub charge_id: String,
    /// Amount refunded so far, in the currency's minor unit
    pub amount_refunded: i64,
    /// Whether the whole charge has been refunded
    pub fully_refunded: bool,
}

/// A validated webhook event in provider-neutral form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider event id, used for idempotency
    pub id: String,
    /// Provider event type (e.g. "payment_intent.succeeded")
    pub event_type: String,
    pub kind: PaymentEventKind,
    /// Order id carried in the payment metadata, if any
    pub order_id: Option<OrderId>,
    pub payment_intent_id: Option<String>,
    pub failure_message: Option<String>,
    pub refund: Option<RefundDetails>,
}

/// Abstract payment provider interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Short provider name, for logs
    fn name(&self) -> &'static str;

    /// Authenticate a webhook delivery and parse it.
    ///
    /// Returns Err if validation fails (invalid signature, stale timestamp, malformed body).
    async fn validate_webhook(&self, headers: &HeaderMap, body: &str) -> Result<WebhookEvent>;

    /// Apply a validated event to its order.
    ///
    /// Idempotent: redelivering an event that was already applied changes nothing.
    async fn process_webhook_event(&self, db_pool: &PgPool, event: &WebhookEvent) -> Result<WebhookOutcome> {
        fulfillment::apply_event(db_pool, event).await
    }
}
