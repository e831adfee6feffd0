//! API request and response data models.
//!
//! API models are distinct from database models so the wire shapes can follow WooCommerce
//! without leaking into storage.
//!
//! - [`products`], [`categories`], [`orders`], [`site`]: WooCommerce REST v3 shapes
//! - [`orders`] also holds the checkout request and response of the storefront API
//! - [`audit_logs`]: audit trail records
//! - [`pagination`]: offset and page-number pagination
//! - [`woocommerce`]: formatting of prices, dates and statuses

pub mod audit_logs;
pub mod categories;
pub mod orders;
pub mod pagination;
pub mod products;
pub mod site;
pub mod woocommerce;
