//! Request extractors that reject with the WooCommerce error envelope.
//!
//! axum's own `Json`, `Query` and `Path` answer bad input with plain-text bodies (and 422 for
//! JSON type errors). These wrappers run the same extraction and convert the rejection into
//! [`Error`], so every malformed request gets `{"code", "message", "data": {"status"}}`.
//!
//! A path parameter that does not parse (`/products/abc`) is reported as `rest_no_route`,
//! matching WooCommerce, whose routes only match numeric ids.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};

use crate::errors::Error;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(_) => Error::NoRoute,
            other => Error::Internal {
                operation: format!("extract path parameters: {}", other.body_text()),
            },
        }
    }
}
