//! Authorization and header construction for edit requests.

use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde_json::Map;
use serde_json::Value;
use sha1::Digest;
use sha1::Sha1;

use super::CookieJar;
use super::RuntimeConfig;
use super::SessionError;

/// Cookies that may hold the session secret, in priority order.
pub const SECRET_COOKIE_NAMES: [&str; 3] = ["SAPISID", "__Secure-3PAPISID", "APISID"];

const AUTHORIZATION_SCHEME: &str = "SAPISIDHASH";

/// First non-empty session secret found in `cookies`.
pub fn session_secret(cookies: &CookieJar) -> Option<String> {
    SECRET_COOKIE_NAMES
        .iter()
        .filter_map(|name| cookies.cookie(name))
        .find(|value| !value.is_empty())
}

/// Authorization value for `secret` at the current time, or `None` when
/// there is no secret to sign with.
pub fn authorization_header(secret: Option<&str>, origin: &str) -> Option<String> {
    authorization_header_at(secret, origin, chrono::Utc::now().timestamp())
}

/// Authorization value for `secret` at `timestamp` (seconds since epoch).
///
/// The digest is SHA-1 over `"{timestamp} {secret} {origin}"`, rendered as
/// lowercase hex.
pub fn authorization_header_at(secret: Option<&str>, origin: &str, timestamp: i64) -> Option<String> {
    let secret = secret.filter(|secret| !secret.is_empty())?;
    let digest = Sha1::digest(format!("{timestamp} {secret} {origin}").as_bytes());
    Some(format!(
        "{AUTHORIZATION_SCHEME} {timestamp}_{}",
        hex::encode(digest)
    ))
}

/// Headers for one edit request.
pub fn build_headers(
    config: &RuntimeConfig,
    origin: &str,
    authorization: Option<&str>,
) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    insert(&mut headers, "x-origin", origin)?;
    insert(&mut headers, "x-youtube-client-name", &config.client_name)?;
    insert(&mut headers, "x-youtube-client-version", &config.client_version)?;
    insert(&mut headers, "x-goog-authuser", &config.session_index)?;
    insert(&mut headers, "x-goog-visitor-id", &config.visitor_data)?;
    headers.insert(
        HeaderName::from_static("x-youtube-bootstrap-logged-in"),
        HeaderValue::from_static("true"),
    );

    if !config.delegated_session_id.is_empty() {
        insert(&mut headers, "x-goog-pageid", &config.delegated_session_id)?;
    }
    if let Some(authorization) = authorization.filter(|value| !value.is_empty()) {
        insert(&mut headers, "authorization", authorization)?;
    }
    Ok(headers)
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(value).map_err(|_| SessionError::InvalidHeader { name })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Request context for the body: the host's context with the delegated
/// identity injected under `user.onBehalfOfUser`.
///
/// Works on a copy; the captured config is left untouched.
pub fn build_request_context(config: &RuntimeConfig) -> Value {
    let mut context = match &config.request_context {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    let mut user = match context.get("user") {
        Some(Value::Object(user)) => user.clone(),
        _ => Map::new(),
    };
    if !config.delegated_session_id.is_empty() {
        user.insert(
            "onBehalfOfUser".to_string(),
            Value::String(config.delegated_session_id.clone()),
        );
    }
    context.insert("user".to_string(), Value::Object(user));
    Value::Object(context)
}
