//! Order endpoints: checkout on the storefront API, and read-only WooCommerce order views.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    api::{
        extract::{JsonBody, PathParam, QueryParams},
        models::{
            orders::{ListOrdersQuery, OrderCreate, OrderResponse, WooOrder},
            pagination::page_headers,
            woocommerce::{fits_amount_column, parse_order_status},
        },
    },
    auth::store_credentials::StoreCredentials,
    crypto::generate_order_key,
    db::{
        handlers::{Orders, Products, Repository},
        models::{
            orders::{OrderCreateDBRequest, OrderFilter, OrderItemCreateDBRequest, order_total},
            products::ProductStatus,
        },
    },
    errors::{Error, ErrorBody, Resource, Result},
    types::{OrderId, ProductId},
};

fn invalid_items(message: String) -> Error {
    Error::InvalidParam {
        param: "items".to_string(),
        message,
    }
}

/// Merge repeated cart lines for the same product, keeping first-seen order.
fn merge_lines(body: &OrderCreate) -> Result<Vec<(ProductId, i32)>> {
    if body.items.is_empty() {
        return Err(Error::BadRequest {
            message: "An order must contain at least one item".to_string(),
        });
    }

    let mut merged: Vec<(ProductId, i32)> = Vec::with_capacity(body.items.len());
    let mut positions: HashMap<ProductId, usize> = HashMap::new();
    for item in &body.items {
        if item.quantity < 1 {
            return Err(invalid_items(format!("quantity for product {} must be at least 1", item.product_id)));
        }

        match positions.get(&item.product_id) {
            Some(&index) => {
                let line = &mut merged[index];
                line.1 = line
                    .1
                    .checked_add(item.quantity)
                    .ok_or_else(|| invalid_items(format!("quantity for product {} is too large", item.product_id)))?;
            }
            None => {
                positions.insert(item.product_id, merged.len());
                merged.push((item.product_id, item.quantity));
            }
        }
    }
    Ok(merged)
}

#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    summary = "Place an order",
    description = "Creates a pending, unpaid order. Unit prices come from the catalog (sale price when set) and the total is the sum of all lines. Repeated lines for the same product are merged before stock is checked.",
    request_body = OrderCreate,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Empty cart, bad quantity, unavailable product or insufficient stock", body = ErrorBody),
        (status = 409, description = "Payment intent already attached to another order", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<OrderCreate>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let customer_email = body.customer_email.trim().to_string();
    if customer_email.is_empty() || !customer_email.contains('@') {
        return Err(Error::InvalidParam {
            param: "customer_email".to_string(),
            message: "must be an email address".to_string(),
        });
    }

    let lines = merge_lines(&body)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let products = Products::new(&mut conn)
        .get_bulk(lines.iter().map(|(product_id, _)| *product_id).collect())
        .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product_id, quantity) in lines {
        let product = products
            .get(&product_id)
            .ok_or_else(|| invalid_items(format!("product {product_id} does not exist")))?;
        if product.status != ProductStatus::Active {
            return Err(invalid_items(format!("product {product_id} is not available for sale")));
        }
        if !product.has_stock_for(quantity) {
            return Err(invalid_items(format!(
                "insufficient stock for '{}': requested {}, available {}",
                product.name,
                quantity,
                product.stock_quantity.unwrap_or(0)
            )));
        }

        let item = OrderItemCreateDBRequest {
            product_id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            quantity,
            unit_price: product.effective_price(),
        };
        if !fits_amount_column(item.line_total()) {
            return Err(invalid_items(format!("line total for product {product_id} is too large")));
        }
        items.push(item);
    }
    if !fits_amount_column(order_total(&items)) {
        return Err(invalid_items("order total is too large".to_string()));
    }

    let request = OrderCreateDBRequest {
        order_key: generate_order_key(),
        currency: state.config.store.currency.clone(),
        customer_email,
        customer_name: body.customer_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        shipping_address: body.shipping_address,
        payment_intent_id: body.payment_intent_id.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        items,
    };

    let mut orders = Orders::new(&mut conn);
    let order = orders.create(&request).await?;
    let items = orders.get_items(order.id).await?;
    tracing::info!("Created order {} with {} line(s), total {} {}", order.id, items.len(), order.total, order.currency);

    Ok((StatusCode::CREATED, Json(OrderResponse::new(order, items))))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    summary = "Get an order",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its lines", body = OrderResponse),
        (status = 404, description = "Unknown order", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_order(State(state): State<AppState>, PathParam(id): PathParam<OrderId>) -> Result<Json<OrderResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut orders = Orders::new(&mut conn);
    let order = orders.get_by_id(id).await?.ok_or_else(|| Error::not_found(Resource::Order, id))?;
    let items = orders.get_items(id).await?;

    Ok(Json(OrderResponse::new(order, items)))
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    summary = "List orders (WooCommerce)",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Page of orders, newest first", body = Vec<WooOrder>,
            headers(
                ("X-WP-Total" = i64, description = "Total number of matching orders"),
                ("X-WP-TotalPages" = i64, description = "Total number of pages"),
            )
        ),
        (status = 400, description = "Unknown status filter", body = ErrorBody),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_woo_orders(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    _: StoreCredentials,
    QueryParams(query): QueryParams<ListOrdersQuery>,
) -> Result<(HeaderMap, Json<Vec<WooOrder>>)> {
    let woo = &state.config.woocommerce;
    let window = query.pagination.window(woo.default_per_page, woo.max_per_page);
    let filter = OrderFilter {
        skip: window.skip(),
        limit: window.limit(),
        status: match query.status.as_deref() {
            Some(status) => parse_order_status(status)?,
            None => None,
        },
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut orders = Orders::new(&mut conn);
    let page = orders.list(&filter).await?;
    let total = orders.count(&filter).await?;
    let ids: Vec<OrderId> = page.iter().map(|o| o.id).collect();
    let mut items = orders.get_items_bulk(&ids).await?;

    let body = page
        .into_iter()
        .map(|order| {
            let lines = items.remove(&order.id).unwrap_or_default();
            WooOrder::new(order, lines)
        })
        .collect();

    Ok((page_headers(total, window, uri.path(), uri.query()), Json(body)))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    summary = "Get order (WooCommerce)",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = WooOrder),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 404, description = "Unknown order", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_woo_order(
    State(state): State<AppState>,
    _: StoreCredentials,
    PathParam(id): PathParam<OrderId>,
) -> Result<Json<WooOrder>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut orders = Orders::new(&mut conn);
    let order = orders.get_by_id(id).await?.ok_or_else(|| Error::not_found(Resource::Order, id))?;
    let items = orders.get_items(id).await?;

    Ok(Json(WooOrder::new(order, items)))
}
