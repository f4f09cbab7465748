//! Session and permissions cookies.
//!
//! The session cookie replays an opaque backend token; nothing here inspects it.

use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine as _, engine::general_purpose};

use crate::errors::{Error, Result};

/// Name of the cookie carrying the session token
pub const AUTH_COOKIE_NAME: &str = "authtok";

/// Name of the cookie carrying the base64 JSON permission list
pub const PERMISSIONS_COOKIE_NAME: &str = "permissions";

/// Render the session cookie. `path` is `Some("/")` on fresh issuance and `None` on
/// refresh or when sending the cookie to a remote instance.
pub fn auth_cookie(token: &str, path: Option<&str>) -> String {
    render_cookie(AUTH_COOKIE_NAME, token, path)
}

/// Render the permissions cookie: base64 of the JSON array of permission identifiers, at `/`.
pub fn permissions_cookie(permissions: &[String]) -> Result<String> {
    let json = serde_json::to_vec(permissions).map_err(|e| Error::Internal {
        operation: format!("serialize permissions: {e}"),
    })?;
    let value = general_purpose::STANDARD.encode(json);
    Ok(render_cookie(PERMISSIONS_COOKIE_NAME, &value, Some("/")))
}

/// Render a bare `name=value` cookie string with an optional `Path` attribute
pub fn render_cookie(name: &str, value: &str, path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{name}={value}; Path={path}"),
        _ => format!("{name}={value}"),
    }
}

/// Find a cookie by name in the request's `Cookie` header(s).
///
/// Returns the first match. Surrounding double quotes are stripped from the value.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(cookie_name, _)| *cookie_name == name)
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .to_string()
        })
}

/// Append a `Set-Cookie` header to a response header map
pub fn append_set_cookie(response: &mut HeaderMap, cookie: &str) -> Result<()> {
    let value = HeaderValue::from_str(cookie).map_err(|e| Error::Internal {
        operation: format!("encode Set-Cookie header: {e}"),
    })?;
    response.append(header::SET_COOKIE, value);
    Ok(())
}
