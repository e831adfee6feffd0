//! Order resources: the checkout request and response of the storefront API, and the read-only
//! WooCommerce order shape.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::PagePagination;
use super::woocommerce::{format_date, format_price};
use crate::db::models::orders::{OrderDBResponse, OrderItemDBResponse, OrderStatus, PaymentStatus};
use crate::types::{OrderId, OrderItemId, ProductId};

/// One cart line in a checkout request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemCreate {
    pub product_id: ProductId,
    #[schema(minimum = 1, example = 2)]
    pub quantity: i32,
}

/// Request body for placing an order. Prices are always taken from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    #[schema(example = "jane@example.com")]
    pub customer_email: String,
    pub customer_name: Option<String>,
    /// Free-form shipping address, stored as given
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<serde_json::Value>,
    pub items: Vec<OrderItemCreate>,
    /// Stripe PaymentIntent created for this checkout, if already known
    #[schema(example = "pi_3MtwBwLkdIwHu7ix28a3tqPa")]
    pub payment_intent_id: Option<String>,
}

/// An order line as returned by the storefront API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "25.00")]
    pub line_total: Decimal,
}

impl From<OrderItemDBResponse> for OrderItemResponse {
    fn from(item: OrderItemDBResponse) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            name: item.name,
            sku: item.sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        }
    }
}

/// An order with its lines as returned by the storefront API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_key: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    #[schema(value_type = String, example = "25.00")]
    pub total: Decimal,
    pub customer_email: String,
    pub customer_name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<serde_json::Value>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn new(order: OrderDBResponse, items: Vec<OrderItemDBResponse>) -> Self {
        Self {
            id: order.id,
            order_key: order.order_key,
            status: order.status,
            payment_status: order.payment_status,
            currency: order.currency,
            total: order.total,
            customer_email: order.customer_email,
            customer_name: order.customer_name,
            shipping_address: order.shipping_address,
            payment_intent_id: order.payment_intent_id,
            paid_at: order.paid_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Query parameters for listing orders through the WooCommerce emulator
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListOrdersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PagePagination,

    /// `pending`, `processing`, `completed`, `cancelled`, `refunded` or `any`
    pub status: Option<String>,
}

/// Billing contact on a WooCommerce order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooBilling {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A line item on a WooCommerce order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooLineItem {
    pub id: OrderItemId,
    pub name: String,
    /// `0` when the product has since been deleted
    pub product_id: ProductId,
    pub quantity: i32,
    pub subtotal: String,
    pub total: String,
    pub sku: String,
    pub price: String,
}

impl From<OrderItemDBResponse> for WooLineItem {
    fn from(item: OrderItemDBResponse) -> Self {
        Self {
            id: item.id,
            name: item.name,
            product_id: item.product_id.unwrap_or(0),
            quantity: item.quantity,
            subtotal: format_price(item.line_total),
            total: format_price(item.line_total),
            sku: item.sku.unwrap_or_default(),
            price: format_price(item.unit_price),
        }
    }
}

/// An order in WooCommerce REST v3 shape
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooOrder {
    pub id: OrderId,
    pub order_key: String,
    /// `pending`, `processing`, `completed`, `cancelled`, `refunded` or `failed`
    pub status: String,
    pub currency: String,
    pub date_created: String,
    pub date_created_gmt: String,
    pub date_modified: String,
    pub date_modified_gmt: String,
    pub date_paid: Option<String>,
    pub date_paid_gmt: Option<String>,
    pub total: String,
    pub customer_id: i64,
    pub billing: WooBilling,
    #[schema(value_type = Object)]
    pub shipping: serde_json::Value,
    pub payment_method: String,
    pub payment_method_title: String,
    /// Stripe PaymentIntent id, empty when none is attached
    pub transaction_id: String,
    pub line_items: Vec<WooLineItem>,
}

impl WooOrder {
    pub fn new(order: OrderDBResponse, items: Vec<OrderItemDBResponse>) -> Self {
        let (first_name, last_name) = split_name(order.customer_name.as_deref().unwrap_or_default());
        let date_paid = order.paid_at.as_ref().map(format_date);

        Self {
            id: order.id,
            status: order.status.as_str().to_string(),
            order_key: order.order_key,
            currency: order.currency,
            date_created: format_date(&order.created_at),
            date_created_gmt: format_date(&order.created_at),
            date_modified: format_date(&order.updated_at),
            date_modified_gmt: format_date(&order.updated_at),
            date_paid_gmt: date_paid.clone(),
            date_paid,
            total: format_price(order.total),
            customer_id: 0,
            billing: WooBilling {
                first_name,
                last_name,
                email: order.customer_email,
            },
            shipping: order.shipping_address.unwrap_or_else(|| serde_json::json!({})),
            payment_method: "stripe".to_string(),
            payment_method_title: "Stripe".to_string(),
            transaction_id: order.payment_intent_id.unwrap_or_default(),
            line_items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Split "Jane Q. Doe" into ("Jane", "Q. Doe").
fn split_name(full: &str) -> (String, String) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (full.to_string(), String::new()),
    }
}
