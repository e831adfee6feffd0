use axum::{
    Json,
    extract::{OriginalUri, State},
    http::HeaderMap,
};

use crate::{
    AppState,
    api::{
        extract::QueryParams,
        models::{
            categories::{ListCategoriesQuery, WooCategory},
            pagination::page_headers,
        },
    },
    auth::store_credentials::StoreCredentials,
    db::handlers::Categories,
    errors::{Error, ErrorBody, Result},
};

#[utoipa::path(
    get,
    path = "/products/categories",
    tag = "categories",
    summary = "List product categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "Page of categories", body = Vec<WooCategory>,
            headers(
                ("X-WP-Total" = i64, description = "Total number of matching categories"),
                ("X-WP-TotalPages" = i64, description = "Total number of pages"),
            )
        ),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    _: StoreCredentials,
    QueryParams(query): QueryParams<ListCategoriesQuery>,
) -> Result<(HeaderMap, Json<Vec<WooCategory>>)> {
    let woo = &state.config.woocommerce;
    let window = query.pagination.window(woo.default_per_page, woo.max_per_page);
    let filter = query.to_filter(window.skip(), window.limit());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Categories::new(&mut conn);
    let categories = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let headers = page_headers(total, window, uri.path(), uri.query());
    Ok((headers, Json(categories.into_iter().map(WooCategory::from).collect())))
}
