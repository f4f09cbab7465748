//! Outbound credentials: headers for calling this service (or another instance of it) as a client.

use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use crate::{
    auth::session::{auth_cookie, render_cookie},
    config::HttpConfig,
    errors::{Error, Result},
};

/// Credentials a client presents. A non-empty `token` wins over `username`/`password`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationOpts {
    pub username: String,
    pub password: String,
    pub token: String,
}

impl AuthenticationOpts {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Build a fresh header map carrying these credentials and the `http` cookies
    pub fn headers(&self, http: &HttpConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        set_auth_headers(&mut headers, self, http)?;
        Ok(headers)
    }
}

/// Value of an `Authorization: Basic` header for the given pair
pub fn basic_authorization(username: &str, password: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

/// Apply every header needed to authenticate against an instance of this service.
///
/// The session token goes out as the session cookie; without a token a username switches to
/// Basic authentication. The `http.cookie` pairs are always appended, and all cookies are sent
/// as a single `Cookie` header joined by `"; "`.
pub fn set_auth_headers(headers: &mut HeaderMap, opts: &AuthenticationOpts, http: &HttpConfig) -> Result<()> {
    let mut cookies = Vec::with_capacity(http.cookie.len() + 1);

    if !opts.token.is_empty() {
        cookies.push(auth_cookie(&opts.token, None));
    } else if !opts.username.is_empty() {
        headers.insert(
            header::AUTHORIZATION,
            header_value(&basic_authorization(&opts.username, &opts.password))?,
        );
    }

    // Cookies that come from the config, typically required by a proxy
    cookies.extend(http.cookie.iter().map(|(name, value)| render_cookie(name, value, None)));

    if !cookies.is_empty() {
        headers.insert(header::COOKIE, header_value(&cookies.join("; "))?);
    }
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::BadRequest {
        message: format!("Credentials cannot be sent as an HTTP header: {e}"),
    })
}
