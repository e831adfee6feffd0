//! WooCommerce-shaped product categories.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::pagination::PagePagination;
use super::products::ProductImage;
use crate::db::models::categories::{CategoryDBResponse, CategoryFilter};
use crate::types::CategoryId;

/// Query parameters for listing categories
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListCategoriesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PagePagination,

    /// Case-insensitive match on name or slug
    pub search: Option<String>,

    /// Only direct children of this category
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub parent: Option<CategoryId>,

    /// Hide categories without products
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub hide_empty: Option<bool>,
}

impl ListCategoriesQuery {
    pub fn to_filter(&self, skip: i64, limit: i64) -> CategoryFilter {
        let mut filter = CategoryFilter::new(skip, limit);
        filter.search = self.search.clone().filter(|s| !s.trim().is_empty());
        filter.parent_id = self.parent;
        filter.hide_empty = self.hide_empty.unwrap_or(false);
        filter
    }
}

/// A product category in WooCommerce REST v3 shape
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooCategory {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Parent category id, `0` for top-level categories
    pub parent: CategoryId,
    pub description: String,
    pub display: String,
    pub image: Option<ProductImage>,
    pub menu_order: i32,
    /// Number of non-archived products in the category
    pub count: i64,
}

impl From<CategoryDBResponse> for WooCategory {
    fn from(category: CategoryDBResponse) -> Self {
        let image = category.image_url.map(|src| ProductImage {
            id: 0,
            src,
            name: category.name.clone(),
            alt: category.name.clone(),
        });

        Self {
            id: category.id,
            parent: category.parent_id.unwrap_or(0),
            name: category.name,
            slug: category.slug,
            description: category.description,
            display: "default".to_string(),
            image,
            menu_order: 0,
            count: category.product_count,
        }
    }
}
