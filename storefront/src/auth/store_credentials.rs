use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use base64::{Engine as _, engine::general_purpose};
use tracing::instrument;

use crate::{
    AppState,
    config::WooCommerceConfig,
    crypto::constant_time_eq,
    errors::{Error, Result},
};

/// Extractor guarding the WooCommerce routes and the audit log.
///
/// When the store has a consumer key and secret configured, requests must present them, either
/// as HTTP Basic credentials or as `consumer_key` / `consumer_secret` query parameters. Without
/// configured credentials every request passes.
#[derive(Debug, Clone, Copy)]
pub struct StoreCredentials;

impl FromRequestParts<AppState> for StoreCredentials {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        check_credentials(&state.config.woocommerce, &parts.headers, parts.uri.query())?;
        Ok(StoreCredentials)
    }
}

/// Check the presented credentials against the configured ones.
pub fn check_credentials(config: &WooCommerceConfig, headers: &HeaderMap, query: Option<&str>) -> Result<()> {
    let Some((expected_key, expected_secret)) = config.credentials() else {
        return Ok(());
    };

    let Some((key, secret)) = basic_credentials(headers).or_else(|| query_credentials(query)) else {
        return Err(Error::Unauthenticated { message: None });
    };

    // Evaluate both comparisons so a wrong key and a wrong secret take the same time
    let key_matches = constant_time_eq(key.as_bytes(), expected_key.as_bytes());
    let secret_matches = constant_time_eq(secret.as_bytes(), expected_secret.as_bytes());
    if key_matches && secret_matches {
        Ok(())
    } else {
        Err(Error::Unauthenticated {
            message: Some("Consumer key or secret is invalid.".to_string()),
        })
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (key, secret) = decoded.split_once(':')?;
    Some((key.to_string(), secret.to_string()))
}

fn query_credentials(query: Option<&str>) -> Option<(String, String)> {
    let mut key = None;
    let mut secret = None;
    for (name, value) in url::form_urlencoded::parse(query?.as_bytes()) {
        match name.as_ref() {
            "consumer_key" => key = Some(value.into_owned()),
            "consumer_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    Some((key?, secret?))
}
