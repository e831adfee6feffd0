//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extract`]**: Body, query and path extractors that reject with the error envelope
//!
//! # API Structure
//!
//! - **WooCommerce emulator** (`/wp-json`, `/wp-json/wc/v3/*`, `/wc/v3/*`): products,
//!   categories, orders and system status in WooCommerce REST v3 shape
//! - **Storefront** (`/api/v1/*`): checkout and the audit log
//! - **Payments** (`/webhooks/stripe`): payment provider webhooks
//!
//! All endpoints are documented with `utoipa`; the rendered docs are served at `/docs`.

pub mod extract;
pub mod handlers;
pub mod models;
