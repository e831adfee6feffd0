use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Store credentials required but missing or wrong
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// A single query or body parameter failed validation
    #[error("Invalid parameter {param}: {message}")]
    InvalidParam { param: String, message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: Resource, id: String },

    /// No route matched the request path
    #[error("No route was found matching the URL and request method")]
    NoRoute,

    /// Feature disabled by configuration
    #[error("{message}")]
    NotImplemented { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Resource kinds that can be looked up by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Product,
    Category,
    Order,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Product => write!(f, "Product"),
            Resource::Category => write!(f, "Category"),
            Resource::Order => write!(f, "Order"),
        }
    }
}

/// WooCommerce error envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub data: ErrorData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorData {
    pub status: u16,
}

impl Error {
    pub fn not_found(resource: Resource, id: impl ToString) -> Self {
        Error::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } | Error::InvalidParam { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } | Error::NoRoute => StatusCode::NOT_FOUND,
            Error::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code, using the names WooCommerce clients expect
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated { .. } => "woocommerce_rest_cannot_view",
            Error::BadRequest { .. } | Error::InvalidParam { .. } => "woocommerce_rest_invalid_param",
            Error::NotFound { resource, .. } => match resource {
                Resource::Product => "woocommerce_rest_product_invalid_id",
                Resource::Category => "woocommerce_rest_term_invalid",
                Resource::Order => "woocommerce_rest_shop_order_invalid_id",
            },
            Error::NoRoute => "rest_no_route",
            Error::NotImplemented { .. } => "rest_not_implemented",
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "woocommerce_rest_invalid_id",
                DbError::UniqueViolation { constraint, .. } => match constraint.as_deref() {
                    Some("products_sku_unique") => "product_invalid_sku",
                    Some("products_slug_unique") | Some("categories_slug_unique") => "woocommerce_rest_invalid_slug",
                    _ => "woocommerce_rest_resource_exists",
                },
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => "woocommerce_rest_invalid_param",
                DbError::Other(_) => "internal_server_error",
            },
            Error::Internal { .. } | Error::Other(_) => "internal_server_error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Sorry, you cannot list resources.".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::InvalidParam { param, message } => format!("Invalid parameter(s): {param} ({message})"),
            Error::NotFound { resource, .. } => format!("Invalid {} ID.", resource.to_string().to_lowercase()),
            Error::NoRoute => "No route was found matching the URL and request method.".to_string(),
            Error::NotImplemented { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation {
                    constraint,
                    conflicting_value,
                    ..
                } => {
                    let value = conflicting_value.as_deref().unwrap_or("value");
                    match constraint.as_deref() {
                        Some("products_sku_unique") => format!("Invalid or duplicated SKU: {value}"),
                        Some("products_slug_unique") | Some("categories_slug_unique") => format!("Slug {value} is already in use"),
                        _ => "Resource already exists".to_string(),
                    }
                }
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.user_message(),
            data: ErrorData {
                status: self.status_code().as_u16(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } | Error::InvalidParam { .. } | Error::NotFound { .. } | Error::NoRoute | Error::NotImplemented { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
