//! Value formatting shared by the WooCommerce-shaped models.
//!
//! WooCommerce renders money as decimal strings, dates as naive local timestamps, and product
//! states under its own names. These helpers keep the conversions in one place.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::models::orders::OrderStatus;
use crate::db::models::products::ProductStatus;
use crate::errors::Error;

/// `2024-05-01T12:30:00`, as WooCommerce renders `date_created` and friends.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Amounts are stored as `NUMERIC(12, 2)`: ten whole digits at most.
const MAX_WHOLE_UNITS: i64 = 10_000_000_000;

/// Whether `amount` fits the money columns.
pub fn fits_amount_column(amount: Decimal) -> bool {
    amount < Decimal::from(MAX_WHOLE_UNITS)
}

/// Money as a decimal string with two places.
pub fn format_price(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}

/// WooCommerce name for a stored product status.
pub fn product_status_name(status: ProductStatus) -> &'static str {
    match status {
        ProductStatus::Active => "publish",
        ProductStatus::Draft => "draft",
        ProductStatus::Archived => "trash",
    }
}

/// Parse a WooCommerce product status. `pending` and `private` have no storefront equivalent and
/// are kept as drafts.
pub fn parse_product_status(param: &str, value: &str) -> Result<ProductStatus, Error> {
    match value {
        "publish" => Ok(ProductStatus::Active),
        "draft" | "pending" | "private" => Ok(ProductStatus::Draft),
        "trash" => Ok(ProductStatus::Archived),
        other => Err(Error::InvalidParam {
            param: param.to_string(),
            message: format!("unknown status '{other}'"),
        }),
    }
}

/// Parse an order status filter. `any` means no filter.
pub fn parse_order_status(value: &str) -> Result<Option<OrderStatus>, Error> {
    match value {
        "any" => Ok(None),
        "pending" => Ok(Some(OrderStatus::Pending)),
        "processing" => Ok(Some(OrderStatus::Processing)),
        "completed" => Ok(Some(OrderStatus::Completed)),
        "cancelled" => Ok(Some(OrderStatus::Cancelled)),
        "refunded" => Ok(Some(OrderStatus::Refunded)),
        other => Err(Error::InvalidParam {
            param: "status".to_string(),
            message: format!("unknown order status '{other}'"),
        }),
    }
}

/// A price as WooCommerce clients send it: usually a string, sometimes a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    /// Parse into a non-negative amount. An empty string means "no price".
    pub fn parse(&self, param: &str) -> Result<Option<Decimal>, Error> {
        let raw = match self {
            PriceInput::Text(text) => text.trim().to_string(),
            PriceInput::Number(number) => number.to_string(),
        };
        if raw.is_empty() {
            return Ok(None);
        }

        let invalid = |message: &str| Error::InvalidParam {
            param: param.to_string(),
            message: message.to_string(),
        };
        let price = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| invalid("not a valid price"))?;
        if price.is_sign_negative() {
            return Err(invalid("must not be negative"));
        }
        let price = price.round_dp(2);
        if !fits_amount_column(price) {
            return Err(invalid("must be less than 10000000000"));
        }
        Ok(Some(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_price_always_has_two_places() {
        assert_eq!(format_price(Decimal::new(5, 0)), "5.00");
        assert_eq!(format_price(Decimal::new(1250, 2)), "12.50");
        assert_eq!(format_price(Decimal::new(19999, 3)), "20.00");
    }

    #[test]
    fn test_format_date_has_no_offset() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(format_date(&date), "2024-05-01T12:30:00");
    }

    #[test]
    fn test_product_status_mapping() {
        assert_eq!(product_status_name(ProductStatus::Active), "publish");
        assert_eq!(product_status_name(ProductStatus::Archived), "trash");
        assert_eq!(parse_product_status("status", "publish").unwrap(), ProductStatus::Active);
        assert_eq!(parse_product_status("status", "private").unwrap(), ProductStatus::Draft);
        assert_eq!(parse_product_status("status", "pending").unwrap(), ProductStatus::Draft);
        assert!(matches!(parse_product_status("status", "live"), Err(Error::InvalidParam { .. })));
    }

    #[test]
    fn test_parse_order_status() {
        assert_eq!(parse_order_status("any").unwrap(), None);
        assert_eq!(parse_order_status("refunded").unwrap(), Some(OrderStatus::Refunded));
        assert!(parse_order_status("on-hold").is_err());
    }

    #[test]
    fn test_price_input_accepts_strings_and_numbers() {
        let text: PriceInput = serde_json::from_value(serde_json::json!("19.99")).unwrap();
        assert_eq!(text.parse("regular_price").unwrap(), Some(Decimal::new(1999, 2)));

        let number: PriceInput = serde_json::from_value(serde_json::json!(7.5)).unwrap();
        assert_eq!(number.parse("regular_price").unwrap(), Some(Decimal::new(750, 2)));

        let integer: PriceInput = serde_json::from_value(serde_json::json!(3)).unwrap();
        assert_eq!(integer.parse("regular_price").unwrap(), Some(Decimal::new(3, 0)));

        let empty: PriceInput = serde_json::from_value(serde_json::json!("")).unwrap();
        assert_eq!(empty.parse("sale_price").unwrap(), None);
    }

    #[test]
    fn test_price_input_rejects_garbage() {
        let negative: PriceInput = serde_json::from_value(serde_json::json!("-1")).unwrap();
        assert!(negative.parse("regular_price").is_err());

        let words: PriceInput = serde_json::from_value(serde_json::json!("cheap")).unwrap();
        assert!(words.parse("regular_price").is_err());
    }

    #[test]
    fn test_price_input_rejects_amounts_too_large_to_store() {
        let largest: PriceInput = serde_json::from_value(serde_json::json!("9999999999.99")).unwrap();
        assert_eq!(largest.parse("regular_price").unwrap(), Some(Decimal::new(999_999_999_999, 2)));

        for raw in [serde_json::json!("10000000000"), serde_json::json!(1e11), serde_json::json!("9999999999.999")] {
            let price: PriceInput = serde_json::from_value(raw.clone()).unwrap();
            assert!(
                matches!(price.parse("regular_price"), Err(Error::InvalidParam { ref param, .. }) if param == "regular_price"),
                "{raw} should be rejected"
            );
        }
    }
}
