//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] covers three surfaces:
//! - the WooCommerce emulator, documented under `/wp-json/wc/v3` (also served at `/wc/v3`)
//! - the storefront API at `/api/v1`
//! - the payment webhooks

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::{handlers, models},
    errors::{ErrorBody, ErrorData},
};

/// Security schemes accepted by the WooCommerce routes.
struct StoreSecurityAddon;

impl Modify for StoreSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "BasicAuth".to_string(),
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Basic)
                    .description(Some(
                        "Consumer key as the username and consumer secret as the password:\n\n\
                        ```\nAuthorization: Basic base64(ck_...:cs_...)\n```",
                    ))
                    .build(),
            ),
        );
        components.security_schemes.insert(
            "ConsumerKey".to_string(),
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::with_description(
                "consumer_key",
                "Consumer key as a query parameter. Send `consumer_secret` alongside it.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::site::namespace_index,
        handlers::site::system_status,
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::categories::list_categories,
        handlers::orders::list_woo_orders,
        handlers::orders::get_woo_order,
    ),
    components(schemas(
        models::products::WooProduct,
        models::products::ProductWrite,
        models::categories::WooCategory,
        models::orders::WooOrder,
        models::site::NamespaceIndex,
        models::site::SystemStatus,
    ))
)]
pub struct WooApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::audit_logs::list_audit_logs,
    ),
    components(schemas(
        models::orders::OrderCreate,
        models::orders::OrderResponse,
        models::audit_logs::AuditLogResponse,
    ))
)]
pub struct StorefrontApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "Storefront backend: a WooCommerce REST v3 compatible catalog and order API, storefront checkout, and Stripe payment webhooks.",
    ),
    paths(handlers::site::site_index, handlers::payments::stripe_webhook),
    components(schemas(ErrorBody, ErrorData, handlers::payments::WebhookAck, models::site::SiteIndex)),
    nest(
        (path = "/wp-json/wc/v3", api = WooApi),
        (path = "/api/v1", api = StorefrontApi),
    ),
    modifiers(&StoreSecurityAddon),
    tags(
        (name = "site", description = "WordPress REST discovery and store status"),
        (name = "products", description = "WooCommerce product catalog"),
        (name = "categories", description = "WooCommerce product categories"),
        (name = "orders", description = "Order checkout and WooCommerce order views"),
        (name = "payments", description = "Payment provider webhooks"),
        (name = "audit", description = "Audit trail of payment-driven order changes"),
    )
)]
pub struct ApiDoc;
