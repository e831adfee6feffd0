//! Database models for product categories.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::CategoryId;

/// Database row for a category with the number of non-archived products in it
#[derive(Debug, Clone, FromRow)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a new category
#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

/// Filter for listing categories
#[derive(Debug, Clone)]
pub struct CategoryFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub hide_empty: bool,
}

impl CategoryFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
            parent_id: None,
            hide_empty: false,
        }
    }
}
