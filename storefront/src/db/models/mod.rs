//! Database record models matching table schemas.
//!
//! Each model struct matches a table row and derives `sqlx::FromRow`. Database models are
//! kept apart from the API models in [`crate::api::models`] so that the WooCommerce wire
//! format can evolve independently of storage.
//!
//! - [`products`]: Catalog products, stock and pricing
//! - [`categories`]: Product categories
//! - [`orders`]: Orders, line items and payment state
//! - [`audit_logs`]: Audit trail of payment-driven changes

pub mod audit_logs;
pub mod categories;
pub mod orders;
pub mod products;
