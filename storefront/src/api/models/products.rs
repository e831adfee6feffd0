//! WooCommerce-shaped product resources.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::pagination::PagePagination;
use super::woocommerce::{PriceInput, format_date, format_price, parse_product_status, product_status_name};
use crate::config::StoreConfig;
use crate::db::models::products::{
    ProductCreateDBRequest, ProductDBResponse, ProductFilter, ProductOrderBy, ProductStatus, ProductUpdateDBRequest,
};
use crate::errors::Error;
use crate::types::{CategoryId, ProductId, slugify};

/// Query parameters for listing products
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListProductsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PagePagination,

    /// Case-insensitive match on name, SKU or description
    pub search: Option<String>,

    /// Only products in this category
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub category: Option<CategoryId>,

    /// `publish`, `draft`, `trash` or `any`. Trashed products are hidden by default.
    pub status: Option<String>,

    pub sku: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub featured: Option<bool>,

    /// `date`, `id`, `title`, `slug` or `price` (default: `date`)
    pub orderby: Option<String>,

    /// `asc` or `desc` (default: `desc`)
    pub order: Option<String>,
}

impl ListProductsQuery {
    pub fn to_filter(&self, skip: i64, limit: i64) -> Result<ProductFilter, Error> {
        let mut filter = ProductFilter::new(skip, limit);
        filter.search = self.search.clone().filter(|s| !s.trim().is_empty());
        filter.category_id = self.category;
        filter.sku = self.sku.clone().filter(|s| !s.is_empty());
        filter.featured = self.featured;

        if let Some(status) = self.status.as_deref() {
            filter.statuses = match status {
                "any" => Vec::new(),
                other => vec![parse_product_status("status", other)?],
            };
        }

        if let Some(orderby) = self.orderby.as_deref() {
            filter.order_by = match orderby {
                "date" => ProductOrderBy::Date,
                "id" => ProductOrderBy::Id,
                "title" => ProductOrderBy::Title,
                "slug" => ProductOrderBy::Slug,
                "price" => ProductOrderBy::Price,
                other => {
                    return Err(Error::InvalidParam {
                        param: "orderby".to_string(),
                        message: format!("cannot order by '{other}'"),
                    });
                }
            };
        }

        if let Some(order) = self.order.as_deref() {
            filter.descending = match order.to_ascii_lowercase().as_str() {
                "desc" => true,
                "asc" => false,
                _ => {
                    return Err(Error::InvalidParam {
                        param: "order".to_string(),
                        message: "must be 'asc' or 'desc'".to_string(),
                    });
                }
            };
        }

        Ok(filter)
    }
}

/// Query parameters for deleting a product
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct DeleteProductQuery {
    /// Delete permanently instead of moving to the trash
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub force: Option<bool>,
}

/// Category reference inside a product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// Product image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: i64,
    pub src: String,
    pub name: String,
    pub alt: String,
}

/// A product in WooCommerce REST v3 shape
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WooProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub permalink: String,
    pub date_created: String,
    pub date_created_gmt: String,
    pub date_modified: String,
    pub date_modified_gmt: String,
    #[serde(rename = "type")]
    pub product_type: String,
    /// `publish`, `draft` or `trash`
    pub status: String,
    pub featured: bool,
    pub catalog_visibility: String,
    pub description: String,
    pub short_description: String,
    pub sku: String,
    #[schema(example = "19.99")]
    pub price: String,
    pub regular_price: String,
    /// Empty when the product has no sale price
    pub sale_price: String,
    pub on_sale: bool,
    pub purchasable: bool,
    pub manage_stock: bool,
    pub stock_quantity: Option<i32>,
    /// `instock` or `outofstock`
    pub stock_status: String,
    pub categories: Vec<ProductCategoryRef>,
    pub images: Vec<ProductImage>,
}

impl WooProduct {
    pub fn from_db(product: ProductDBResponse, store: &StoreConfig) -> Self {
        let on_sale = product.is_on_sale();
        let in_stock = product.in_stock();
        let price = format_price(product.effective_price());

        let categories = match (product.category_id, product.category_name, product.category_slug) {
            (Some(id), Some(name), Some(slug)) => vec![ProductCategoryRef { id, name, slug }],
            _ => Vec::new(),
        };
        let images = product
            .image_url
            .map(|src| {
                vec![ProductImage {
                    id: 0,
                    src,
                    name: product.name.clone(),
                    alt: product.name.clone(),
                }]
            })
            .unwrap_or_default();

        Self {
            id: product.id,
            permalink: format!("{}/product/{}", store.base_url(), product.slug),
            name: product.name,
            slug: product.slug,
            date_created: format_date(&product.created_at),
            date_created_gmt: format_date(&product.created_at),
            date_modified: format_date(&product.updated_at),
            date_modified_gmt: format_date(&product.updated_at),
            product_type: "simple".to_string(),
            status: product_status_name(product.status).to_string(),
            featured: product.featured,
            catalog_visibility: "visible".to_string(),
            description: product.description,
            short_description: product.short_description,
            sku: product.sku.unwrap_or_default(),
            price,
            regular_price: format_price(product.regular_price),
            sale_price: product.sale_price.map(format_price).unwrap_or_default(),
            on_sale,
            purchasable: product.status == ProductStatus::Active,
            manage_stock: product.manage_stock,
            stock_quantity: product.stock_quantity,
            stock_status: if in_stock { "instock" } else { "outofstock" }.to_string(),
            categories,
            images,
        }
    }
}

/// Category reference in a request body; only the id is read
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryRefInput {
    pub id: CategoryId,
}

/// Image in a request body; only the source URL is read
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImageInput {
    pub src: String,
}

/// Request body for creating or updating a product. On update every field is optional and only
/// the fields present are changed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductWrite {
    pub name: Option<String>,
    pub slug: Option<String>,
    /// Empty string clears the SKU
    pub sku: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    #[schema(value_type = Option<String>, example = "19.99")]
    pub regular_price: Option<PriceInput>,
    /// Empty string clears the sale price
    #[schema(value_type = Option<String>, example = "14.99")]
    pub sale_price: Option<PriceInput>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub manage_stock: Option<bool>,
    /// `null` clears the stock quantity
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub stock_quantity: Option<Option<i32>>,
    /// Only the first category is used
    pub categories: Option<Vec<CategoryRefInput>>,
    /// Only the first image is used
    pub images: Option<Vec<ImageInput>>,
}

impl ProductWrite {
    /// Build an insert request. `name` is required; the slug is derived from it when absent.
    pub fn into_create_request(self) -> Result<ProductCreateDBRequest, Error> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(Error::InvalidParam {
                param: "name".to_string(),
                message: "is required".to_string(),
            });
        }

        let slug = self.slug()?.unwrap_or_else(|| slugify(&name));
        if slug.is_empty() {
            return Err(Error::InvalidParam {
                param: "slug".to_string(),
                message: "could not be derived from the product name".to_string(),
            });
        }

        let stock_quantity = self.stock_quantity()?.flatten();
        let status = self.status()?.unwrap_or(ProductStatus::Active);
        let regular_price = match &self.regular_price {
            Some(price) => price.parse("regular_price")?.unwrap_or_default(),
            None => Default::default(),
        };
        let sale_price = self.sale_price.as_ref().map(|p| p.parse("sale_price")).transpose()?.flatten();
        let sku = self.sku().flatten();
        let category_id = self.category_id().flatten();
        let image_url = self.image_url().flatten();

        Ok(ProductCreateDBRequest {
            name,
            slug,
            sku,
            description: self.description.unwrap_or_default(),
            short_description: self.short_description.unwrap_or_default(),
            regular_price,
            sale_price,
            status,
            featured: self.featured.unwrap_or(false),
            manage_stock: self.manage_stock.unwrap_or(stock_quantity.is_some()),
            stock_quantity,
            category_id,
            image_url,
        })
    }

    /// Build a partial update from the fields present in the body.
    pub fn into_update_request(self) -> Result<ProductUpdateDBRequest, Error> {
        let name = match self.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(Error::InvalidParam {
                    param: "name".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            other => other.map(str::to_string),
        };

        let regular_price = match &self.regular_price {
            Some(price) => Some(price.parse("regular_price")?.unwrap_or_default()),
            None => None,
        };

        Ok(ProductUpdateDBRequest {
            name,
            slug: self.slug()?,
            sku: self.sku(),
            regular_price,
            sale_price: self.sale_price.as_ref().map(|p| p.parse("sale_price")).transpose()?,
            status: self.status()?,
            featured: self.featured,
            manage_stock: self.manage_stock,
            stock_quantity: self.stock_quantity()?,
            category_id: self.category_id(),
            image_url: self.image_url(),
            description: self.description,
            short_description: self.short_description,
        })
    }

    fn slug(&self) -> Result<Option<String>, Error> {
        match self.slug.as_deref() {
            None => Ok(None),
            Some(raw) => {
                let slug = slugify(raw);
                if slug.is_empty() {
                    return Err(Error::InvalidParam {
                        param: "slug".to_string(),
                        message: "must contain at least one letter or digit".to_string(),
                    });
                }
                Ok(Some(slug))
            }
        }
    }

    fn sku(&self) -> Option<Option<String>> {
        self.sku.as_deref().map(|sku| Some(sku.trim().to_string()).filter(|s| !s.is_empty()))
    }

    fn status(&self) -> Result<Option<ProductStatus>, Error> {
        self.status.as_deref().map(|s| parse_product_status("status", s)).transpose()
    }

    fn stock_quantity(&self) -> Result<Option<Option<i32>>, Error> {
        if let Some(Some(quantity)) = self.stock_quantity
            && quantity < 0
        {
            return Err(Error::InvalidParam {
                param: "stock_quantity".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(self.stock_quantity)
    }

    /// An empty `categories` list detaches the product from its category.
    fn category_id(&self) -> Option<Option<CategoryId>> {
        self.categories.as_ref().map(|categories| categories.first().map(|c| c.id))
    }

    fn image_url(&self) -> Option<Option<String>> {
        self.images
            .as_ref()
            .map(|images| images.first().map(|i| i.src.trim().to_string()).filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn store() -> StoreConfig {
        StoreConfig {
            url: "https://shop.example.com/".to_string(),
            ..Default::default()
        }
    }

    fn db_product() -> ProductDBResponse {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        ProductDBResponse {
            id: 42,
            name: "Blue Hoodie".to_string(),
            slug: "blue-hoodie".to_string(),
            sku: Some("HOOD-BLUE".to_string()),
            description: "Warm".to_string(),
            short_description: String::new(),
            regular_price: Decimal::new(4000, 2),
            sale_price: Some(Decimal::new(3250, 2)),
            status: ProductStatus::Active,
            featured: true,
            manage_stock: true,
            stock_quantity: Some(0),
            category_id: Some(3),
            category_name: Some("Apparel".to_string()),
            category_slug: Some("apparel".to_string()),
            image_url: Some("https://cdn.example.com/hoodie.png".to_string()),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_product_shape() {
        let product = WooProduct::from_db(db_product(), &store());

        assert_eq!(product.permalink, "https://shop.example.com/product/blue-hoodie");
        assert_eq!(product.status, "publish");
        assert_eq!(product.price, "32.50");
        assert_eq!(product.regular_price, "40.00");
        assert_eq!(product.sale_price, "32.50");
        assert!(product.on_sale);
        assert_eq!(product.stock_status, "outofstock");
        assert_eq!(product.date_created, "2024-05-01T12:30:00");
        assert_eq!(product.date_created_gmt, product.date_created);
        assert_eq!(product.categories.len(), 1);
        assert_eq!(product.categories[0].slug, "apparel");
        assert_eq!(product.images[0].src, "https://cdn.example.com/hoodie.png");

        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["type"], "simple");
    }

    #[test]
    fn test_product_without_sale_price() {
        let mut db = db_product();
        db.sale_price = None;
        db.manage_stock = false;
        db.category_id = None;
        db.image_url = None;

        let product = WooProduct::from_db(db, &store());
        assert_eq!(product.price, "40.00");
        assert_eq!(product.sale_price, "");
        assert!(!product.on_sale);
        assert_eq!(product.stock_status, "instock");
        assert!(product.categories.is_empty());
        assert!(product.images.is_empty());
    }

    #[test]
    fn test_create_request_defaults() {
        let body: ProductWrite = serde_json::from_value(json!({
            "name": "Coffee Beans (1kg)",
            "regular_price": "18",
            "stock_quantity": 12,
            "categories": [{"id": 5}, {"id": 6}],
            "images": [{"src": "https://cdn.example.com/beans.png"}]
        }))
        .unwrap();

        let request = body.into_create_request().unwrap();
        assert_eq!(request.slug, "coffee-beans-1kg");
        assert_eq!(request.regular_price, Decimal::new(18, 0));
        assert_eq!(request.sale_price, None);
        assert_eq!(request.status, ProductStatus::Active);
        assert!(request.manage_stock);
        assert_eq!(request.stock_quantity, Some(12));
        assert_eq!(request.category_id, Some(5));
        assert_eq!(request.image_url.as_deref(), Some("https://cdn.example.com/beans.png"));
    }

    #[test]
    fn test_create_request_requires_name() {
        let body: ProductWrite = serde_json::from_value(json!({"regular_price": "1.00"})).unwrap();
        assert!(matches!(body.into_create_request(), Err(Error::InvalidParam { param, .. }) if param == "name"));

        let body: ProductWrite = serde_json::from_value(json!({"name": "   "})).unwrap();
        assert!(body.into_create_request().is_err());
    }

    #[test]
    fn test_update_request_only_touches_present_fields() {
        let body: ProductWrite = serde_json::from_value(json!({
            "sale_price": "",
            "stock_quantity": null,
            "status": "private"
        }))
        .unwrap();

        let update = body.into_update_request().unwrap();
        assert_eq!(update.name, None);
        assert_eq!(update.regular_price, None);
        assert_eq!(update.sale_price, Some(None));
        assert_eq!(update.stock_quantity, Some(None));
        assert_eq!(update.status, Some(ProductStatus::Draft));
        assert_eq!(update.category_id, None);
    }

    #[test]
    fn test_update_rejects_negative_stock() {
        let body: ProductWrite = serde_json::from_value(json!({"stock_quantity": -1})).unwrap();
        assert!(body.into_update_request().is_err());
    }

    #[test]
    fn test_list_query_to_filter() {
        let query = ListProductsQuery {
            status: Some("any".to_string()),
            orderby: Some("price".to_string()),
            order: Some("ASC".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter(0, 10).unwrap();
        assert!(filter.statuses.is_empty());
        assert_eq!(filter.order_by, ProductOrderBy::Price);
        assert!(!filter.descending);
        assert_eq!(filter.search, None);

        let default_filter = ListProductsQuery::default().to_filter(20, 10).unwrap();
        assert_eq!(default_filter.statuses, vec![ProductStatus::Active, ProductStatus::Draft]);
        assert!(default_filter.descending);
        assert_eq!(default_filter.skip, 20);

        let bad = ListProductsQuery {
            orderby: Some("popularity".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.to_filter(0, 10), Err(Error::InvalidParam { param, .. }) if param == "orderby"));
    }
}
