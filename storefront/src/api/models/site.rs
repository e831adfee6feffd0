//! Discovery documents: the `/wp-json` site index, the `wc/v3` namespace index and the system
//! status report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::StoreConfig;

pub const NAMESPACE: &str = "wc/v3";

/// Routes served under the `wc/v3` namespace, with their methods.
pub const ROUTES: &[(&str, &[&str])] = &[
    ("/wc/v3", &["GET"]),
    ("/wc/v3/products", &["GET", "POST"]),
    ("/wc/v3/products/(?P<id>[\\d]+)", &["GET", "PUT", "PATCH", "DELETE"]),
    ("/wc/v3/products/categories", &["GET"]),
    ("/wc/v3/orders", &["GET"]),
    ("/wc/v3/orders/(?P<id>[\\d]+)", &["GET"]),
    ("/wc/v3/system_status", &["GET"]),
];

/// Methods supported by one route
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RouteInfo {
    pub namespace: String,
    pub methods: Vec<String>,
}

fn route_map() -> BTreeMap<String, RouteInfo> {
    ROUTES
        .iter()
        .map(|(path, methods)| {
            (
                path.to_string(),
                RouteInfo {
                    namespace: NAMESPACE.to_string(),
                    methods: methods.iter().map(|m| m.to_string()).collect(),
                },
            )
        })
        .collect()
}

/// Response of `GET /wp-json`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SiteIndex {
    pub name: String,
    pub description: String,
    pub url: String,
    pub home: String,
    pub gmt_offset: i32,
    pub timezone_string: String,
    pub namespaces: Vec<String>,
    pub routes: BTreeMap<String, RouteInfo>,
}

impl SiteIndex {
    pub fn new(store: &StoreConfig) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone(),
            url: store.base_url().to_string(),
            home: store.base_url().to_string(),
            gmt_offset: 0,
            timezone_string: "UTC".to_string(),
            namespaces: vec![NAMESPACE.to_string()],
            routes: route_map(),
        }
    }
}

/// Response of `GET /wc/v3`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NamespaceIndex {
    pub namespace: String,
    pub routes: BTreeMap<String, RouteInfo>,
}

impl Default for NamespaceIndex {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            routes: route_map(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentStatus {
    pub home_url: String,
    pub site_url: String,
    /// Emulated WooCommerce version
    pub version: String,
    pub server_info: String,
    pub default_timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStatus {
    pub wc_database_version: String,
    /// Output of `SELECT version()`
    pub server_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettingsStatus {
    pub currency: String,
    pub currency_symbol: String,
    pub currency_position: String,
    pub thousand_separator: String,
    pub decimal_separator: String,
    pub number_of_decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecurityStatus {
    pub secure_connection: bool,
    pub hide_errors: bool,
}

/// Response of `GET /wc/v3/system_status`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemStatus {
    pub environment: EnvironmentStatus,
    pub database: DatabaseStatus,
    pub settings: SettingsStatus,
    pub security: SecurityStatus,
    pub active_plugins: Vec<String>,
}

impl SystemStatus {
    pub fn new(store: &StoreConfig, database_version: String) -> Self {
        Self {
            environment: EnvironmentStatus {
                home_url: store.base_url().to_string(),
                site_url: store.base_url().to_string(),
                version: store.woocommerce_version.clone(),
                server_info: format!("storefront/{}", env!("CARGO_PKG_VERSION")),
                default_timezone: "UTC".to_string(),
            },
            database: DatabaseStatus {
                wc_database_version: store.woocommerce_version.clone(),
                server_version: database_version,
            },
            settings: SettingsStatus {
                currency: store.currency.clone(),
                currency_symbol: store.currency_symbol.clone(),
                currency_position: "left".to_string(),
                thousand_separator: store.thousand_separator.clone(),
                decimal_separator: store.decimal_separator.clone(),
                number_of_decimals: store.price_decimals,
            },
            security: SecurityStatus {
                secure_connection: store.base_url().starts_with("https://"),
                hide_errors: true,
            },
            active_plugins: Vec::new(),
        }
    }
}
