use axum::{
    Json,
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::{
        extract::{JsonBody, PathParam, QueryParams},
        models::{
            pagination::page_headers,
            products::{DeleteProductQuery, ListProductsQuery, ProductWrite, WooProduct},
        },
    },
    auth::store_credentials::StoreCredentials,
    db::{
        errors::DbError,
        handlers::{Categories, Products, Repository},
    },
    errors::{Error, ErrorBody, Resource, Result},
    types::{CategoryId, ProductId},
};

/// Reject category references that do not exist, so clients get a parameter error rather than a
/// constraint failure.
async fn ensure_category_exists(conn: &mut PgConnection, category_id: Option<CategoryId>) -> Result<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    let mut categories = Categories::new(conn);
    if categories.get_by_id(category_id).await?.is_none() {
        return Err(Error::InvalidParam {
            param: "categories".to_string(),
            message: format!("category {category_id} does not exist"),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    summary = "List products",
    description = "Paginated product list. Trashed products are only included with `status=trash` or `status=any`.",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Page of products", body = Vec<WooProduct>,
            headers(
                ("X-WP-Total" = i64, description = "Total number of matching products"),
                ("X-WP-TotalPages" = i64, description = "Total number of pages"),
                ("Link" = String, description = "prev/next page links"),
            )
        ),
        (status = 400, description = "Invalid query parameter", body = ErrorBody),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    _: StoreCredentials,
    QueryParams(query): QueryParams<ListProductsQuery>,
) -> Result<(HeaderMap, Json<Vec<WooProduct>>)> {
    let woo = &state.config.woocommerce;
    let window = query.pagination.window(woo.default_per_page, woo.max_per_page);
    let filter = query.to_filter(window.skip(), window.limit())?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut conn);
    let products = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let headers = page_headers(total, window, uri.path(), uri.query());
    let body = products
        .into_iter()
        .map(|product| WooProduct::from_db(product, &state.config.store))
        .collect();
    Ok((headers, Json(body)))
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    summary = "Create product",
    description = "Create a product. `name` is required; the slug is derived from the name when absent.",
    request_body = ProductWrite,
    responses(
        (status = 201, description = "Product created", body = WooProduct),
        (status = 400, description = "Invalid product data", body = ErrorBody),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 409, description = "Slug or SKU already in use", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    _: StoreCredentials,
    JsonBody(body): JsonBody<ProductWrite>,
) -> Result<(StatusCode, Json<WooProduct>)> {
    let request = body.into_create_request()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    ensure_category_exists(&mut conn, request.category_id).await?;

    let product = Products::new(&mut conn).create(&request).await?;
    tracing::info!("Created product {} ({})", product.id, product.slug);

    Ok((StatusCode::CREATED, Json(WooProduct::from_db(product, &state.config.store))))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    summary = "Get product",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = WooProduct),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(
    State(state): State<AppState>,
    _: StoreCredentials,
    PathParam(id): PathParam<ProductId>,
) -> Result<Json<WooProduct>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let product = Products::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(Resource::Product, id))?;

    Ok(Json(WooProduct::from_db(product, &state.config.store)))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    summary = "Update product",
    description = "Partial update: only the fields present in the body change.",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductWrite,
    responses(
        (status = 200, description = "Updated product", body = WooProduct),
        (status = 400, description = "Invalid product data", body = ErrorBody),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody),
        (status = 409, description = "Slug or SKU already in use", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    _: StoreCredentials,
    PathParam(id): PathParam<ProductId>,
    JsonBody(body): JsonBody<ProductWrite>,
) -> Result<Json<WooProduct>> {
    let request = body.into_update_request()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    ensure_category_exists(&mut conn, request.category_id.flatten()).await?;

    let product = match Products::new(&mut conn).update(id, &request).await {
        Ok(product) => product,
        Err(DbError::NotFound) => return Err(Error::not_found(Resource::Product, id)),
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Updated product {}", product.id);

    Ok(Json(WooProduct::from_db(product, &state.config.store)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    summary = "Delete product",
    description = "Moves the product to the trash, or removes it for good with `force=true`. Returns the product as it was before.",
    params(("id" = i64, Path, description = "Product ID"), DeleteProductQuery),
    responses(
        (status = 200, description = "The product before deletion", body = WooProduct),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 404, description = "Unknown product", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    _: StoreCredentials,
    PathParam(id): PathParam<ProductId>,
    QueryParams(query): QueryParams<DeleteProductQuery>,
) -> Result<Json<WooProduct>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Products::new(&mut conn);

    let force = query.force.unwrap_or(false);
    let outcome = if force { repo.remove(id).await } else { repo.archive(id).await };
    let product = match outcome {
        Ok(product) => product,
        Err(DbError::NotFound) => return Err(Error::not_found(Resource::Product, id)),
        Err(e) => return Err(e.into()),
    };
    if force {
        tracing::info!("Deleted product {}", id);
    } else {
        tracing::info!("Moved product {} to the trash", id);
    }

    Ok(Json(WooProduct::from_db(product, &state.config.store)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    use crate::{
        api::models::products::WooProduct,
        db::handlers::{Products, Repository},
        errors::ErrorBody,
        test_utils::*,
    };

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_product(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let category = create_test_category(&pool, "mugs").await;

        let response = app
            .post("/wp-json/wc/v3/products")
            .json(&json!({
                "name": "Enamel Mug",
                "regular_price": "15.00",
                "sale_price": 12,
                "sku": "MUG-1",
                "stock_quantity": 5,
                "categories": [{"id": category.id}],
                "images": [{"src": "https://cdn.example.com/mug.png"}]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: WooProduct = response.json();
        assert_eq!(created.slug, "enamel-mug");
        assert_eq!(created.price, "12.00");
        assert_eq!(created.regular_price, "15.00");
        assert!(created.on_sale);
        assert!(created.manage_stock);
        assert_eq!(created.categories[0].id, category.id);
        assert_eq!(created.permalink, "http://localhost:3000/product/enamel-mug");

        let response = app.get(&format!("/wc/v3/products/{}", created.id)).await;
        response.assert_status_ok();
        let fetched: WooProduct = response.json();
        assert_eq!(fetched.sku, "MUG-1");
        assert_eq!(fetched.stock_quantity, Some(5));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_product_validation(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.post("/wc/v3/products").json(&json!({"regular_price": "1.00"})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: ErrorBody = response.json();
        assert_eq!(error.code, "woocommerce_rest_invalid_param");

        let response = app
            .post("/wc/v3/products")
            .json(&json!({"name": "Ghost", "categories": [{"id": 999}]}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = app
            .post("/wc/v3/products")
            .json(&json!({"name": "Mug", "regular_price": "-3"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Larger than the money columns hold
        let response = app
            .post("/wc/v3/products")
            .json(&json!({"name": "Huge", "regular_price": "100000000000"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: ErrorBody = response.json();
        assert_eq!(error.code, "woocommerce_rest_invalid_param");
        assert!(error.message.contains("regular_price"), "{}", error.message);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_sku_is_conflict(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let body = json!({"name": "Mug", "sku": "DUP"});
        app.post("/wc/v3/products").json(&body).await.assert_status(StatusCode::CREATED);

        let response = app.post("/wc/v3/products").json(&json!({"name": "Other Mug", "sku": "DUP"})).await;
        response.assert_status(StatusCode::CONFLICT);
        let error: ErrorBody = response.json();
        assert_eq!(error.code, "product_invalid_sku");
        assert_eq!(error.data.status, 409);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_unknown_product(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app.get("/wc/v3/products/4242").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let error: ErrorBody = response.json();
        assert_eq!(error.code, "woocommerce_rest_product_invalid_id");
        assert_eq!(error.message, "Invalid product ID.");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_products_pagination_headers(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        for i in 0..5 {
            create_test_product(&pool, &format!("product-{i}"), None).await;
        }

        let response = app.get("/wp-json/wc/v3/products?per_page=2&page=2").await;
        response.assert_status_ok();
        assert_eq!(response.header("x-wp-total"), "5");
        assert_eq!(response.header("x-wp-totalpages"), "3");
        let link = response.header("link");
        let link = link.to_str().unwrap();
        assert!(link.contains("page=1>; rel=\"prev\""));
        assert!(link.contains("page=3>; rel=\"next\""));

        let products: Vec<WooProduct> = response.json();
        assert_eq!(products.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_products_filters(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let category = create_test_category(&pool, "tea").await;

        app.post("/wc/v3/products")
            .json(&json!({"name": "Green Tea", "regular_price": "4", "categories": [{"id": category.id}]}))
            .await
            .assert_status(StatusCode::CREATED);
        app.post("/wc/v3/products")
            .json(&json!({"name": "Black Tea", "regular_price": "9", "featured": true}))
            .await
            .assert_status(StatusCode::CREATED);
        app.post("/wc/v3/products")
            .json(&json!({"name": "Coffee", "regular_price": "6"}))
            .await
            .assert_status(StatusCode::CREATED);

        let products: Vec<WooProduct> = app.get("/wc/v3/products?search=tea").await.json();
        assert_eq!(products.len(), 2);

        let products: Vec<WooProduct> = app.get(&format!("/wc/v3/products?category={}", category.id)).await.json();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Green Tea");

        let products: Vec<WooProduct> = app.get("/wc/v3/products?featured=true").await.json();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Black Tea");

        let products: Vec<WooProduct> = app.get("/wc/v3/products?orderby=price&order=asc").await.json();
        let prices: Vec<_> = products.iter().map(|p| p.price.as_str()).collect();
        assert_eq!(prices, vec!["4.00", "6.00", "9.00"]);

        let response = app.get("/wc/v3/products?orderby=popularity").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_product(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let product = create_test_product(&pool, "kettle", Some(3)).await;

        let response = app
            .put(&format!("/wc/v3/products/{}", product.id))
            .json(&json!({"sale_price": "9.99", "stock_quantity": 10, "status": "draft"}))
            .await;
        response.assert_status_ok();
        let updated: WooProduct = response.json();
        assert_eq!(updated.sale_price, "9.99");
        assert_eq!(updated.stock_quantity, Some(10));
        assert_eq!(updated.status, "draft");
        assert_eq!(updated.name, product.name);

        let response = app
            .put(&format!("/wc/v3/products/{}", product.id))
            .json(&json!({"sale_price": ""}))
            .await;
        let updated: WooProduct = response.json();
        assert_eq!(updated.sale_price, "");
        assert!(!updated.on_sale);

        let response = app.put("/wc/v3/products/999999").json(&json!({"name": "Nope"})).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_moves_to_trash_then_force_removes(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let product = create_test_product(&pool, "teapot", None).await;

        let response = app.delete(&format!("/wc/v3/products/{}", product.id)).await;
        response.assert_status_ok();
        let before: WooProduct = response.json();
        assert_eq!(before.status, "publish");

        // Trashed products disappear from the default listing but remain fetchable
        let listed: Vec<WooProduct> = app.get("/wc/v3/products").await.json();
        assert!(listed.is_empty());
        let trashed: WooProduct = app.get(&format!("/wc/v3/products/{}", product.id)).await.json();
        assert_eq!(trashed.status, "trash");
        let listed: Vec<WooProduct> = app.get("/wc/v3/products?status=trash").await.json();
        assert_eq!(listed.len(), 1);

        let response = app.delete(&format!("/wc/v3/products/{}?force=true", product.id)).await;
        response.assert_status_ok();

        let mut conn = pool.acquire().await.unwrap();
        assert!(Products::new(&mut conn).get_by_id(product.id).await.unwrap().is_none());

        app.delete(&format!("/wc/v3/products/{}", product.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let response = app.delete(&format!("/wc/v3/products/{}?force=true", product.id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<ErrorBody>().code, "woocommerce_rest_product_invalid_id");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_credentials_required_when_configured(pool: PgPool) {
        let mut config = create_test_config();
        config.woocommerce.consumer_key = Some("ck_live".to_string());
        config.woocommerce.consumer_secret = Some("cs_live".to_string());
        let app = create_test_app_with_config(pool, config).await;

        let response = app.get("/wc/v3/products").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error: ErrorBody = response.json();
        assert_eq!(error.code, "woocommerce_rest_cannot_view");

        app.get("/wc/v3/products?consumer_key=ck_live&consumer_secret=cs_live")
            .await
            .assert_status_ok();

        // The site index stays public
        app.get("/wp-json").await.assert_status_ok();
    }
}
