//! Per-request authentication protocol.
//!
//! A request authenticates in one of two ways:
//!
//! 1. **Session cookie** - an `authtok` cookie is trusted as-is and re-issued on the response.
//!    The backend is not consulted, so the identity of such a request is unknown.
//! 2. **Basic credentials** - `Authorization: Basic base64(user:password)` is decoded and handed
//!    to the configured backend. On success the user is bootstrapped in the RBAC store and the
//!    session and permissions cookies are set.
//!
//! A request carrying neither is anonymous; deciding whether that is acceptable is left to the
//! caller (see [`crate::auth::middleware`]).

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose};
use std::{fmt, sync::Arc};
use tracing::{debug, instrument, trace};

use crate::{
    auth::{
        backend::AuthenticationBackend,
        bootstrap::bootstrap_user,
        session::{AUTH_COOKIE_NAME, append_set_cookie, auth_cookie, find_cookie},
    },
    errors::{Error, Result},
    rbac::RbacStore,
};

/// Result of a successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `None` when the request came in on the session cookie
    pub username: Option<String>,
    pub token: String,
    /// Permissions recomputed during this request, when the backend was consulted
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Session),
    /// No credentials were presented
    Anonymous,
}

/// Runs the authentication protocol against one backend and one RBAC store.
#[derive(Clone)]
pub struct Authenticator {
    backend: Arc<dyn AuthenticationBackend>,
    rbac: Arc<dyn RbacStore>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator").field("backend", &self.backend).finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(backend: Arc<dyn AuthenticationBackend>, rbac: Arc<dyn RbacStore>) -> Self {
        Self { backend, rbac }
    }

    pub fn backend(&self) -> &dyn AuthenticationBackend {
        self.backend.as_ref()
    }

    /// Authenticate a request from its headers, writing any cookies to `response`.
    ///
    /// `Ok(AuthOutcome::Anonymous)` means no credentials were presented and nothing was written.
    /// Malformed `Authorization` headers fail with [`Error::WrongCredentials`] without reaching
    /// the backend; backend errors are returned unchanged.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn authenticate_with_headers(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<AuthOutcome> {
        if let Some(token) = find_cookie(request, AUTH_COOKIE_NAME) {
            trace!("Session cookie present, refreshing");
            append_set_cookie(response, &auth_cookie(&token, None))?;
            return Ok(AuthOutcome::Authenticated(Session {
                username: None,
                token,
                permissions: None,
            }));
        }

        let Some(authorization) = request.get(header::AUTHORIZATION) else {
            trace!("No credentials presented");
            return Ok(AuthOutcome::Anonymous);
        };

        let value = authorization.to_str().map_err(|_| Error::WrongCredentials)?;
        let (username, password) = parse_basic_credentials(value)?;

        let session = self.login(&username, &password, response).await?;
        Ok(AuthOutcome::Authenticated(session))
    }

    /// Verify credentials with the backend, bootstrap the user and set the session cookies.
    ///
    /// The session cookie is only set when the backend issued a non-empty token; the permissions
    /// cookie is always set.
    #[instrument(skip(self, password, response), fields(backend = self.backend.name()))]
    pub async fn login(&self, username: &str, password: &str, response: &mut HeaderMap) -> Result<Session> {
        let token = self.backend.authenticate(username, password).await?;
        debug!("Backend accepted credentials");

        let bootstrapped = bootstrap_user(self.rbac.as_ref(), self.backend.as_ref(), username).await?;

        if !token.is_empty() {
            append_set_cookie(response, &auth_cookie(&token, Some("/")))?;
        }
        append_set_cookie(response, &bootstrapped.cookie)?;

        Ok(Session {
            username: Some(username.to_string()),
            token,
            permissions: Some(bootstrapped.permissions),
        })
    }
}

/// Decode an `Authorization: Basic` header value into `(username, password)`.
///
/// The password keeps any `:` after the first one.
pub fn parse_basic_credentials(value: &str) -> Result<(String, String)> {
    let (scheme, encoded) = value.split_once(' ').ok_or(Error::WrongCredentials)?;
    if scheme != "Basic" || encoded.contains(' ') {
        return Err(Error::WrongCredentials);
    }

    let decoded = general_purpose::STANDARD.decode(encoded).map_err(|_| Error::WrongCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| Error::WrongCredentials)?;

    let (username, password) = decoded.split_once(':').ok_or(Error::WrongCredentials)?;
    Ok((username.to_string(), password.to_string()))
}
