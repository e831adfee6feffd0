//! Common type definitions.
//!
//! Catalog and order rows use integer IDs because WooCommerce clients expect
//! numeric identifiers on the wire. Audit records are keyed by UUID.

use uuid::Uuid;

// Type aliases for IDs
pub type ProductId = i64;
pub type CategoryId = i64;
pub type OrderId = i64;
pub type OrderItemId = i64;
pub type AuditLogId = Uuid;

/// Turn a display name into a URL slug: lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Blue Hoodie"), "blue-hoodie");
        assert_eq!(slugify("  Coffee -- Beans (1kg) "), "coffee-beans-1kg");
        assert_eq!(slugify("Crème brûlée"), "cr-me-br-l-e");
        assert_eq!(slugify("!!!"), "");
    }
}
