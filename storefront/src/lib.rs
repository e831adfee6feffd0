//! # storefront: Storefront backend with a WooCommerce-compatible API
//!
//! `storefront` serves a small online store out of PostgreSQL. It accepts orders from a storefront
//! frontend, learns about payments from Stripe webhooks, and exposes the catalog and orders
//! through an emulation of the WooCommerce REST API v3 so that tools written against WooCommerce
//! can manage the store unchanged.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence. Migrations run on startup.
//!
//! ### Request Flow
//!
//! #### Checkout (`/api/v1/orders`)
//!
//! The storefront posts the cart. Prices are read from the catalog, never from the request, and
//! the order is stored as pending together with its line items in one transaction. The frontend
//! then confirms the payment with Stripe directly.
//!
//! #### Payment webhooks (`/webhooks/stripe`)
//!
//! Stripe reports the outcome. The [`payment_providers`] layer verifies the signature, claims the
//! event id so redeliveries are no-ops, and applies the guarded order transition together with
//! stock decrements and an audit record.
//!
//! #### WooCommerce emulation (`/wp-json/wc/v3/*`, also `/wc/v3/*`)
//!
//! Products, categories, orders and the system status in WooCommerce's JSON shapes, with
//! `page`/`per_page` pagination and the `X-WP-Total`/`X-WP-TotalPages`/`Link` headers. When
//! consumer credentials are configured these routes require them (see [`auth`]).
//!
//! ### Core Components
//!
//! - [`api`]: handlers and request/response models
//! - [`auth`]: WooCommerce consumer key authentication
//! - [`db`]: repositories over the catalog, order, payment event and audit tables
//! - [`payment_providers`]: webhook validation and order fulfillment
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use storefront::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = storefront::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     storefront::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod errors;
mod openapi;
pub mod payment_providers;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::{CorsOrigin, PoolSettings},
    openapi::ApiDoc,
    payment_providers::PaymentProvider,
};

pub use types::{CategoryId, OrderId, ProductId};

/// Application state shared across all request handlers.
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from file and environment
/// - `payment_provider`: Webhook provider built from `config.payment`; webhooks answer 501 without one
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
}

impl AppState {
    /// Build the state for a config, creating the payment provider it names
    pub fn from_config(db: PgPool, config: Config) -> Self {
        let payment_provider: Option<Arc<dyn PaymentProvider>> = config
            .payment
            .clone()
            .map(|payment| Arc::from(payment_providers::create_provider(payment)));

        AppState::builder()
            .db(db)
            .config(config)
            .maybe_payment_provider(payment_provider)
            .build()
    }
}

/// Get the storefront database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let idle_timeout = (settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs));
    let max_lifetime = (settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(idle_timeout)
        .max_lifetime(max_lifetime)
}

#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    info!("Connecting to database");
    let pool = pool_options(&config.database.pool).connect(&config.database.url).await?;
    migrator().run(&pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers([
            http::header::LINK,
            http::HeaderName::from_static("x-wp-total"),
            http::HeaderName::from_static("x-wp-totalpages"),
        ]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// The WooCommerce routes are mounted twice, under `/wp-json/wc/v3` and `/wc/v3`. Unmatched
/// paths fall through to a `rest_no_route` error. Metrics are served at `/internal/metrics` when
/// enabled.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{audit_logs, categories, orders, payments, products, site};

    let woo_routes = Router::new()
        .route("/", get(site::namespace_index))
        .route("/system_status", get(site::system_status))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/categories", get(categories::list_categories))
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/orders", get(orders::list_woo_orders))
        .route("/orders/{id}", get(orders::get_woo_order))
        .with_state(state.clone());

    let storefront_routes = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/audit-logs", get(audit_logs::list_audit_logs))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/wp-json", get(site::site_index))
        // Webhook routes (called by payment providers, authenticated by signature)
        .route("/webhooks/stripe", post(payments::stripe_webhook))
        .fallback(site::no_route)
        .with_state(state.clone())
        .nest("/wp-json/wc/v3", woo_routes.clone())
        .nest("/wc/v3", woo_routes)
        .nest("/api/v1", storefront_routes)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources.
///
/// # Lifecycle
///
/// 1. **Initialization**: [`Application::new`] connects to the database, runs migrations and
///    builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish, then the pool
///    and telemetry are shut down
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application on an existing pool. Migrations still run.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting storefront with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => {
                migrator().run(&pool).await?;
                pool
            }
            None => setup_database(&config).await?,
        };

        match &config.payment {
            Some(payment) => info!("Payment webhooks enabled ({})", payment_provider_name(payment)),
            None => info!("No payment provider configured, webhooks will answer 501"),
        }
        if config.woocommerce.credentials().is_none() {
            info!("WooCommerce consumer credentials not configured, the REST API is open");
        }

        let app_state = AppState::from_config(pool.clone(), config.clone());
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Storefront listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

fn payment_provider_name(payment: &config::PaymentConfig) -> &'static str {
    match payment {
        config::PaymentConfig::Stripe(_) => "stripe",
        config::PaymentConfig::Dummy => "dummy",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::*;
    use serde_json::Value;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_openapi_json_served(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        let doc: Value = response.json();
        assert_eq!(doc["info"]["title"], "Storefront API");
        assert!(doc["paths"]["/wp-json/wc/v3/products"].is_object());

        app.get("/docs").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_exposes_pagination_headers(pool: PgPool) {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Url("https://shop.example.com".parse().unwrap())];
        let app = create_test_app_with_config(pool, config).await;

        let response = app
            .get("/wc/v3/products")
            .add_header("origin", "https://shop.example.com")
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "https://shop.example.com");
        let exposed = response.header("access-control-expose-headers");
        assert!(exposed.to_str().unwrap().contains("x-wp-total"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_application_with_pool_runs_migrations(pool: PgPool) {
        let app = Application::new_with_pool(create_test_config(), Some(pool.clone())).await.unwrap();
        let server = app.into_test_server();

        server.get("/wp-json/wc/v3/products").await.assert_status_ok();
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name IN ('products', 'orders', 'payment_events', 'audit_logs')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn test_pool_options_treat_zero_as_unlimited() {
        let options = pool_options(&PoolSettings {
            max_connections: 3,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 0,
            max_lifetime_secs: 60,
        });
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(60)));
    }
}
