//! Store credential checks.
//!
//! WooCommerce clients authenticate with a consumer key and secret. When both are configured
//! under `woocommerce`, handlers that take a [`store_credentials::StoreCredentials`] argument
//! reject requests that do not present them:
//!
//! ```ignore
//! use storefront::auth::store_credentials::StoreCredentials;
//!
//! async fn handler(State(state): State<AppState>, _: StoreCredentials) -> Result<Json<T>> {
//!     // only reached with valid credentials, or when none are configured
//! }
//! ```
//!
//! Credentials are accepted as HTTP Basic auth (`Authorization: Basic base64(key:secret)`) or
//! as `consumer_key` / `consumer_secret` query parameters.

pub mod store_credentials;
