//! Database models for orders and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{OrderId, OrderItemId, ProductId};

/// Fulfilment state of an order, stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

/// Payment state of an order, stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Database row for an order (without line items)
#[derive(Debug, Clone, FromRow)]
pub struct OrderDBResponse {
    pub id: OrderId,
    pub order_key: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub total: Decimal,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDBResponse {
    /// A successful payment applies to orders that have not been paid yet: fresh orders, and
    /// orders cancelled by an earlier failed attempt on the same intent.
    pub fn accepts_payment(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Unpaid | PaymentStatus::Failed)
            && matches!(self.status, OrderStatus::Pending | OrderStatus::Cancelled)
    }

    /// A failed payment only cancels orders still waiting for their first payment.
    pub fn accepts_payment_failure(&self) -> bool {
        self.status == OrderStatus::Pending && self.payment_status != PaymentStatus::Paid
    }

    /// Only paid orders can be refunded.
    pub fn accepts_refund(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Database row for an order line item
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemDBResponse {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Database request for a single order line
#[derive(Debug, Clone)]
pub struct OrderItemCreateDBRequest {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItemCreateDBRequest {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of all line totals.
pub fn order_total(items: &[OrderItemCreateDBRequest]) -> Decimal {
    items.iter().map(OrderItemCreateDBRequest::line_total).sum()
}

/// Database request for creating an order with its items
#[derive(Debug, Clone)]
pub struct OrderCreateDBRequest {
    pub order_key: String,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItemCreateDBRequest>,
}

/// Filter for listing orders
#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<OrderStatus>,
}
