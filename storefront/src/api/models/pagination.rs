//! Shared pagination types for API query parameters.
//!
//! Two styles are in use:
//!
//! - [`Pagination`]: offset-based `skip` / `limit`, used by the storefront API
//! - [`PagePagination`]: WooCommerce-style `page` / `per_page`, whose responses carry
//!   `X-WP-Total`, `X-WP-TotalPages` and a `Link` header (see [`page_headers`])

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Offset pagination: `skip` (default 0) and `limit` (default 10, clamped to 1..=100).
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// Generic paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

/// Page-number pagination as WooCommerce clients send it.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PagePagination {
    /// Current page, 1-based (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    /// Items per page (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub per_page: Option<i64>,
}

/// Resolved page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
}

impl PageWindow {
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    /// Number of pages needed for `total` items; zero when there are no items.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 { 0 } else { (total + self.per_page - 1) / self.per_page }
    }
}

impl PagePagination {
    /// Resolve against the configured default and maximum page sizes. Pages below 1 become 1 and
    /// `per_page` is clamped to `1..=max_per_page`.
    pub fn window(&self, default_per_page: i64, max_per_page: i64) -> PageWindow {
        PageWindow {
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(default_per_page).clamp(1, max_per_page),
        }
    }
}

/// `X-WP-Total`, `X-WP-TotalPages` and `Link` headers for a page of results.
///
/// `path` and `query` are the request's own; the `Link` targets are the same request with the
/// `page` parameter replaced.
pub fn page_headers(total: i64, window: PageWindow, path: &str, query: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let total_pages = window.total_pages(total);

    headers.insert(HeaderName::from_static("x-wp-total"), HeaderValue::from(total));
    headers.insert(HeaderName::from_static("x-wp-totalpages"), HeaderValue::from(total_pages));

    let mut links = Vec::new();
    if window.page > 1 && total_pages > 0 {
        let prev = (window.page - 1).min(total_pages);
        links.push(format!("<{}>; rel=\"prev\"", page_url(path, query, prev)));
    }
    if window.page < total_pages {
        links.push(format!("<{}>; rel=\"next\"", page_url(path, query, window.page + 1)));
    }

    if !links.is_empty()
        && let Ok(value) = HeaderValue::from_str(&links.join(", "))
    {
        headers.insert(axum::http::header::LINK, value);
    }

    headers
}

fn page_url(path: &str, query: Option<&str>, page: i64) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key != "page" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("page", &page.to_string());
    format!("{}?{}", path, serializer.finish())
}
