//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection`, so it can run against a pooled connection or
//! inside a transaction, and returns the row types from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Products`]: catalog products, implements [`Repository`]
//! - [`Categories`]: product categories with product counts
//! - [`Orders`]: orders, line items and payment state changes
//! - [`PaymentEvents`]: processed payment provider events, for idempotent webhook handling
//! - [`AuditLogs`]: audit trail of payment-driven changes
//!
//! ```ignore
//! use storefront::db::handlers::{Products, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let product = Products::new(&mut tx).get_by_id(1).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod audit_logs;
pub mod categories;
pub mod orders;
pub mod payment_events;
pub mod products;
pub mod repository;

pub use audit_logs::AuditLogs;
pub use categories::Categories;
pub use orders::Orders;
pub use payment_events::PaymentEvents;
pub use products::Products;
pub use repository::Repository;
