//! Test utilities for integration testing (available with `test-utils` feature).

use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    config::{Config, DatabaseConfig, PaymentConfig, PoolSettings, StripeConfig},
    crypto::generate_order_key,
    db::{
        handlers::{Categories, Orders, Products, Repository},
        models::{
            categories::{CategoryCreateDBRequest, CategoryDBResponse},
            orders::{OrderCreateDBRequest, OrderDBResponse, OrderItemCreateDBRequest},
            products::{ProductCreateDBRequest, ProductDBResponse, ProductStatus},
        },
    },
    types::ProductId,
};

/// Signing secret of the Stripe provider in [`create_test_config`]
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret_for_storefront_tests";

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        database_url: None,
        database: DatabaseConfig {
            // Will get overriden by the pool passed to the application
            url: "Something".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            },
        },
        host: "127.0.0.1".to_string(),
        port: 0,
        payment: Some(PaymentConfig::Stripe(StripeConfig {
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            tolerance: std::time::Duration::from_secs(300),
        })),
        ..Default::default()
    }
}

/// Capitalize each dash separated word: "enamel-mug" becomes "Enamel Mug"
fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn create_test_category(pool: &PgPool, slug: &str) -> CategoryDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Categories::new(&mut conn)
        .create(&CategoryCreateDBRequest {
            name: title_from_slug(slug),
            slug: slug.to_string(),
            description: String::new(),
            parent_id: None,
            image_url: None,
        })
        .await
        .expect("Failed to create test category")
}

/// Published product priced at 12.50. Stock is managed only when `stock_quantity` is set.
pub async fn create_test_product(pool: &PgPool, slug: &str, stock_quantity: Option<i32>) -> ProductDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Products::new(&mut conn)
        .create(&ProductCreateDBRequest {
            name: title_from_slug(slug),
            slug: slug.to_string(),
            sku: None,
            description: String::new(),
            short_description: String::new(),
            regular_price: Decimal::new(1250, 2),
            sale_price: None,
            status: ProductStatus::Active,
            featured: false,
            manage_stock: stock_quantity.is_some(),
            stock_quantity,
            category_id: None,
            image_url: None,
        })
        .await
        .expect("Failed to create test product")
}

/// Pending order for `lines` at the products' current prices
pub async fn create_test_order(pool: &PgPool, lines: &[(ProductId, i32)], payment_intent_id: Option<&str>) -> OrderDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    let mut items = Vec::with_capacity(lines.len());
    for &(product_id, quantity) in lines {
        let product = Products::new(&mut conn)
            .get_by_id(product_id)
            .await
            .expect("Failed to load product")
            .expect("Test order references a missing product");
        items.push(OrderItemCreateDBRequest {
            product_id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            quantity,
            unit_price: product.effective_price(),
        });
    }

    Orders::new(&mut conn)
        .create(&OrderCreateDBRequest {
            order_key: generate_order_key(),
            currency: "USD".to_string(),
            customer_email: "customer@example.com".to_string(),
            customer_name: Some("Test Customer".to_string()),
            shipping_address: None,
            payment_intent_id: payment_intent_id.map(str::to_string),
            items,
        })
        .await
        .expect("Failed to create test order")
}
