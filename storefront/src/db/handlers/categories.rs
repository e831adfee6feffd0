//! Database repository for product categories.

use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    models::categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryFilter},
};
use crate::types::CategoryId;

/// Categories with the number of non-archived products in each, wrapped so filters can refer to
/// `product_count` directly.
const CATEGORY_SELECT: &str = r#"
    SELECT * FROM (
        SELECT
            c.id, c.name, c.slug, c.description, c.parent_id, c.image_url,
            (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id AND p.status <> 'archived') AS product_count,
            c.created_at, c.updated_at
        FROM categories c
    ) cat
    WHERE 1=1
"#;

pub struct Categories<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    pub async fn create(&mut self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let id: CategoryId = sqlx::query_scalar(
            r#"
            INSERT INTO categories (name, slug, description, parent_id, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.slug)
        .bind(&request.description)
        .bind(request.parent_id)
        .bind(&request.image_url)
        .fetch_one(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        let category = sqlx::query_as::<_, CategoryDBResponse>(&format!("{CATEGORY_SELECT} AND cat.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(category)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &CategoryFilter) -> Result<Vec<CategoryDBResponse>> {
        let mut query = QueryBuilder::new(CATEGORY_SELECT);
        push_filters(&mut query, filter);

        query.push(" ORDER BY cat.name ASC, cat.id ASC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let categories = query.build_query_as::<CategoryDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(categories)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &CategoryFilter) -> Result<i64> {
        let mut query = QueryBuilder::new(format!("SELECT COUNT(*) FROM ({CATEGORY_SELECT}"));
        push_filters(&mut query, filter);
        query.push(") counted");

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    if let Some(ref search) = filter.search {
        query.push(" AND cat.name ILIKE ");
        query.push_bind(format!("%{search}%"));
    }

    if let Some(parent_id) = filter.parent_id {
        query.push(" AND cat.parent_id = ");
        query.push_bind(parent_id);
    }

    if filter.hide_empty {
        query.push(" AND cat.product_count > 0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Products, Repository};
    use crate::db::models::products::{ProductCreateDBRequest, ProductStatus};
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn category(name: &str, slug: &str, parent_id: Option<CategoryId>) -> CategoryCreateDBRequest {
        CategoryCreateDBRequest {
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            parent_id,
            image_url: None,
        }
    }

    async fn add_product(conn: &mut PgConnection, slug: &str, category_id: CategoryId, status: ProductStatus) {
        Products::new(conn)
            .create(&ProductCreateDBRequest {
                name: slug.to_string(),
                slug: slug.to_string(),
                sku: None,
                description: String::new(),
                short_description: String::new(),
                regular_price: Decimal::new(500, 2),
                sale_price: None,
                status,
                featured: false,
                manage_stock: false,
                stock_quantity: None,
                category_id: Some(category_id),
                image_url: None,
            })
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_product_count_excludes_archived(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mugs = Categories::new(&mut conn).create(&category("Mugs", "mugs", None)).await.unwrap();
        assert_eq!(mugs.product_count, 0);

        add_product(&mut conn, "blue-mug", mugs.id, ProductStatus::Active).await;
        add_product(&mut conn, "red-mug", mugs.id, ProductStatus::Draft).await;
        add_product(&mut conn, "old-mug", mugs.id, ProductStatus::Archived).await;

        let mugs = Categories::new(&mut conn).get_by_id(mugs.id).await.unwrap().unwrap();
        assert_eq!(mugs.product_count, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let kitchen = Categories::new(&mut conn).create(&category("Kitchen", "kitchen", None)).await.unwrap();
        let mugs = Categories::new(&mut conn)
            .create(&category("Mugs", "mugs", Some(kitchen.id)))
            .await
            .unwrap();
        Categories::new(&mut conn).create(&category("Posters", "posters", None)).await.unwrap();
        add_product(&mut conn, "blue-mug", mugs.id, ProductStatus::Active).await;

        let mut repo = Categories::new(&mut conn);

        let all = repo.list(&CategoryFilter::new(0, 10)).await.unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Kitchen", "Mugs", "Posters"]);
        assert_eq!(repo.count(&CategoryFilter::new(0, 10)).await.unwrap(), 3);

        let mut children = CategoryFilter::new(0, 10);
        children.parent_id = Some(kitchen.id);
        let found = repo.list(&children).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mugs.id);

        let mut non_empty = CategoryFilter::new(0, 10);
        non_empty.hide_empty = true;
        assert_eq!(repo.list(&non_empty).await.unwrap().len(), 1);
        assert_eq!(repo.count(&non_empty).await.unwrap(), 1);

        let mut search = CategoryFilter::new(0, 10);
        search.search = Some("post".to_string());
        assert_eq!(repo.count(&search).await.unwrap(), 1);
    }
}
