//! Database models for catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{CategoryId, ProductId};

/// Product lifecycle state stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Visible in the catalog and purchasable
    Active,
    /// Not yet published
    Draft,
    /// Soft-deleted; kept so historical orders can still reference it
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }
}

/// Database row for a product, joined with its category's name and slug
#[derive(Debug, Clone, FromRow)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub description: String,
    pub short_description: String,
    pub regular_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub status: ProductStatus,
    pub featured: bool,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDBResponse {
    /// The price a customer pays: the sale price when one is set, otherwise the regular price.
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.regular_price)
    }

    /// A product is on sale when its sale price undercuts the regular price.
    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.regular_price)
    }

    /// Whether `quantity` units can be sold. Unmanaged stock is always available.
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        if !self.manage_stock {
            return true;
        }
        self.stock_quantity.unwrap_or(0) >= quantity
    }

    pub fn in_stock(&self) -> bool {
        self.has_stock_for(1)
    }
}

/// Database request for creating a new product
#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub description: String,
    pub short_description: String,
    pub regular_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub status: ProductStatus,
    pub featured: bool,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

/// Database request for a partial product update.
///
/// Nullable columns use `Option<Option<T>>`: the outer `None` leaves the column untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<Option<String>>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Option<Decimal>>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
    pub manage_stock: Option<bool>,
    pub stock_quantity: Option<Option<i32>>,
    pub category_id: Option<Option<CategoryId>>,
    pub image_url: Option<Option<String>>,
}

/// Sort key for product listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrderBy {
    #[default]
    Date,
    Id,
    Title,
    Slug,
    Price,
}

impl ProductOrderBy {
    /// SQL expression to sort by. Only ever built from this enum, never from user input.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Date => "p.created_at",
            Self::Id => "p.id",
            Self::Title => "p.name",
            Self::Slug => "p.slug",
            Self::Price => "COALESCE(p.sale_price, p.regular_price)",
        }
    }
}

/// Filter for listing products
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    /// Allowed statuses; empty means any status
    pub statuses: Vec<ProductStatus>,
    pub sku: Option<String>,
    pub featured: Option<bool>,
    pub order_by: ProductOrderBy,
    pub descending: bool,
}

impl ProductFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
            category_id: None,
            statuses: vec![ProductStatus::Active, ProductStatus::Draft],
            sku: None,
            featured: None,
            order_by: ProductOrderBy::Date,
            descending: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(regular: i64, sale: Option<i64>, manage_stock: bool, stock: Option<i32>) -> ProductDBResponse {
        ProductDBResponse {
            id: 1,
            name: "Mug".to_string(),
            slug: "mug".to_string(),
            sku: None,
            description: String::new(),
            short_description: String::new(),
            regular_price: Decimal::new(regular, 2),
            sale_price: sale.map(|s| Decimal::new(s, 2)),
            status: ProductStatus::Active,
            featured: false,
            manage_stock,
            stock_quantity: stock,
            category_id: None,
            category_name: None,
            category_slug: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_price_prefers_sale_price() {
        assert_eq!(product(1000, None, false, None).effective_price(), Decimal::new(1000, 2));
        assert_eq!(product(1000, Some(750), false, None).effective_price(), Decimal::new(750, 2));
    }

    #[test]
    fn test_on_sale_requires_lower_price() {
        assert!(product(1000, Some(750), false, None).is_on_sale());
        assert!(!product(1000, Some(1000), false, None).is_on_sale());
        assert!(!product(1000, None, false, None).is_on_sale());
    }

    #[test]
    fn test_stock_checks() {
        // Unmanaged stock never runs out
        assert!(product(1000, None, false, None).has_stock_for(1_000));

        let managed = product(1000, None, true, Some(3));
        assert!(managed.has_stock_for(3));
        assert!(!managed.has_stock_for(4));

        let sold_out = product(1000, None, true, Some(0));
        assert!(!sold_out.in_stock());

        // Managed stock with no recorded quantity counts as zero
        assert!(!product(1000, None, true, None).in_stock());
    }
}
