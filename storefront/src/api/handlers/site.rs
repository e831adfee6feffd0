//! Discovery endpoints of the WooCommerce emulator.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::site::{NamespaceIndex, SiteIndex, SystemStatus},
    auth::store_credentials::StoreCredentials,
    errors::{Error, ErrorBody, Result},
};

#[utoipa::path(
    get,
    path = "/wp-json",
    tag = "site",
    summary = "Site index",
    description = "WordPress REST API discovery document listing the `wc/v3` namespace and its routes.",
    responses(
        (status = 200, description = "Site index", body = SiteIndex),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn site_index(State(state): State<AppState>) -> Json<SiteIndex> {
    Json(SiteIndex::new(&state.config.store))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "site",
    summary = "Namespace index",
    responses(
        (status = 200, description = "Routes in the wc/v3 namespace", body = NamespaceIndex),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn namespace_index(_: StoreCredentials) -> Json<NamespaceIndex> {
    Json(NamespaceIndex::default())
}

#[utoipa::path(
    get,
    path = "/system_status",
    tag = "site",
    summary = "System status",
    description = "Environment, database and currency settings of the store.",
    responses(
        (status = 200, description = "System status report", body = SystemStatus),
        (status = 401, description = "Missing or invalid consumer credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    security((), ("BasicAuth" = []), ("ConsumerKey" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn system_status(State(state): State<AppState>, _: StoreCredentials) -> Result<Json<SystemStatus>> {
    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(&state.db)
        .await
        .map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SystemStatus::new(&state.config.store, version)))
}

/// Fallback for unmatched paths, in the WordPress REST error shape
pub async fn no_route() -> Error {
    Error::NoRoute
}
