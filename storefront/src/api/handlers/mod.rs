//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource. Each one validates its input, runs the business logic
//! through the database repositories and serializes the response.
//!
//! # Handler Modules
//!
//! - [`site`]: WordPress discovery documents, system status and the fallback route
//! - [`products`]: WooCommerce product CRUD
//! - [`categories`]: WooCommerce product category listing
//! - [`orders`]: Storefront order creation and the WooCommerce order views
//! - [`payments`]: Payment provider webhooks
//! - [`audit_logs`]: Audit trail of payment-driven order changes
//!
//! # Authentication
//!
//! The WooCommerce routes and the audit log take the
//! [`crate::auth::store_credentials::StoreCredentials`] extractor, which only enforces anything
//! when consumer credentials are configured. Webhooks authenticate by signature instead.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which renders as the WooCommerce error envelope with
//! the matching HTTP status.

pub mod audit_logs;
pub mod categories;
pub mod orders;
pub mod payments;
pub mod products;
pub mod site;
