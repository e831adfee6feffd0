//! Database repository for catalog products.

use std::collections::HashMap;

use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::products::{ProductCreateDBRequest, ProductDBResponse, ProductFilter, ProductStatus, ProductUpdateDBRequest},
};
use crate::types::ProductId;

/// Product columns joined with the owning category's name and slug.
const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.slug, p.sku, p.description, p.short_description,
        p.regular_price, p.sale_price, p.status, p.featured, p.manage_stock,
        p.stock_quantity, p.category_id, c.name AS category_name, c.slug AS category_slug,
        p.image_url, p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

pub struct Products<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Products<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Number of products matching the filter, ignoring pagination.
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ProductFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM products p WHERE 1=1");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    /// Move a product to the trash. Returns the product as it was before archiving.
    #[instrument(skip(self), err)]
    pub async fn archive(&mut self, id: ProductId) -> Result<ProductDBResponse> {
        let before = self.get_by_id(id).await?.ok_or(DbError::NotFound)?;

        let result = sqlx::query("UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(ProductStatus::Archived)
            .execute(&mut *self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(before)
    }

    /// Delete a product for good. Returns the product as it was before deletion, or
    /// [`DbError::NotFound`] when it is already gone.
    #[instrument(skip(self), err)]
    pub async fn remove(&mut self, id: ProductId) -> Result<ProductDBResponse> {
        let before = self.get_by_id(id).await?.ok_or(DbError::NotFound)?;
        if !self.delete(id).await? {
            return Err(DbError::NotFound);
        }

        Ok(before)
    }

    /// Take `quantity` units out of stock, clamping at zero. Products that do not manage their
    /// stock are left untouched. Returns whether a row was changed.
    #[instrument(skip(self), err)]
    pub async fn decrement_stock(&mut self, id: ProductId, quantity: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = GREATEST(stock_quantity - $2, 0), updated_at = NOW()
            WHERE id = $1 AND manage_stock AND stock_quantity IS NOT NULL
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Escape `LIKE` wildcards so search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the WHERE clauses for a product filter. Expects the query to already end in a WHERE
/// clause and the products table to be aliased `p`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(ref search) = filter.search {
        let pattern = format!("%{}%", escape_like(search));
        query.push(" AND (p.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(r" ESCAPE '\' OR COALESCE(p.sku, '') ILIKE ");
        query.push_bind(pattern.clone());
        query.push(r" ESCAPE '\' OR p.description ILIKE ");
        query.push_bind(pattern);
        query.push(r" ESCAPE '\')");
    }

    if let Some(category_id) = filter.category_id {
        query.push(" AND p.category_id = ");
        query.push_bind(category_id);
    }

    if !filter.statuses.is_empty() {
        let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
        query.push(" AND p.status = ANY(");
        query.push_bind(statuses);
        query.push(")");
    }

    if let Some(ref sku) = filter.sku {
        query.push(" AND p.sku = ");
        query.push_bind(sku.clone());
    }

    if let Some(featured) = filter.featured {
        query.push(" AND p.featured = ");
        query.push_bind(featured);
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Products<'c> {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id: ProductId = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                name, slug, sku, description, short_description, regular_price, sale_price,
                status, featured, manage_stock, stock_quantity, category_id, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.sku)
        .bind(&request.description)
        .bind(&request.short_description)
        .bind(request.regular_price)
        .bind(request.sale_price)
        .bind(request.status)
        .bind(request.featured)
        .bind(request.manage_stock)
        .bind(request.stock_quantity)
        .bind(request.category_id)
        .bind(&request.image_url)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let product = sqlx::query_as::<_, ProductDBResponse>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(product)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let products = sqlx::query_as::<_, ProductDBResponse>(&format!("{PRODUCT_SELECT} WHERE p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(PRODUCT_SELECT);
        query.push(" WHERE 1=1");
        push_filters(&mut query, filter);

        let direction = if filter.descending { "DESC" } else { "ASC" };
        query.push(format!(
            " ORDER BY {} {direction}, p.id {direction} LIMIT ",
            filter.order_by.column()
        ));
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let products = query.build_query_as::<ProductDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(products)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");

        if let Some(ref name) = request.name {
            query.push(", name = ").push_bind(name.clone());
        }
        if let Some(ref slug) = request.slug {
            query.push(", slug = ").push_bind(slug.clone());
        }
        if let Some(ref sku) = request.sku {
            query.push(", sku = ").push_bind(sku.clone());
        }
        if let Some(ref description) = request.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(ref short_description) = request.short_description {
            query.push(", short_description = ").push_bind(short_description.clone());
        }
        if let Some(regular_price) = request.regular_price {
            query.push(", regular_price = ").push_bind(regular_price);
        }
        if let Some(sale_price) = request.sale_price {
            query.push(", sale_price = ").push_bind(sale_price);
        }
        if let Some(status) = request.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(featured) = request.featured {
            query.push(", featured = ").push_bind(featured);
        }
        if let Some(manage_stock) = request.manage_stock {
            query.push(", manage_stock = ").push_bind(manage_stock);
        }
        if let Some(stock_quantity) = request.stock_quantity {
            query.push(", stock_quantity = ").push_bind(stock_quantity);
        }
        if let Some(category_id) = request.category_id {
            query.push(", category_id = ").push_bind(category_id);
        }
        if let Some(ref image_url) = request.image_url {
            query.push(", image_url = ").push_bind(image_url.clone());
        }

        query.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

        let updated: Option<ProductId> = query.build_query_scalar().fetch_optional(&mut *self.db).await?;
        let updated = updated.ok_or(DbError::NotFound)?;

        self.get_by_id(updated).await?.ok_or(DbError::NotFound)
    }
}
