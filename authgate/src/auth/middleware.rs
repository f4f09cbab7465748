//! Route protection.
//!
//! [`wrap`] puts a router behind the configured backend: handlers only run for requests that
//! authenticate, and they read the verified [`Identity`] from the request extensions.

use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::{self, Next},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    auth::{
        authenticator::{AuthOutcome, Authenticator},
        noauth::NOAUTH_USERNAME,
    },
    errors::{Error, Result},
};

/// Identity of an authenticated request, available to wrapped handlers as an extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// `None` when the request authenticated with the session cookie alone
    pub username: Option<String>,
    pub token: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(Error::Unauthenticated)
    }
}

/// Authenticate `request` and attach its [`Identity`]. Cookies to send back are written to
/// `cookies`.
pub(crate) async fn authenticate_request(authenticator: &Authenticator, mut request: Request, cookies: &mut HeaderMap) -> Result<Request> {
    if !authenticator.backend().requires_credentials() {
        trace!("Authentication disabled, letting request through");
        request.extensions_mut().insert(Identity {
            username: Some(NOAUTH_USERNAME.to_string()),
            token: String::new(),
        });
        return Ok(request);
    }

    let session = match authenticator.authenticate_with_headers(request.headers(), cookies).await? {
        AuthOutcome::Authenticated(session) => session,
        AuthOutcome::Anonymous => {
            debug!("Rejecting anonymous request to {}", request.uri().path());
            return Err(Error::Unauthenticated);
        }
    };

    request.extensions_mut().insert(Identity {
        username: session.username,
        token: session.token,
    });
    Ok(request)
}

/// Middleware that only lets authenticated requests reach the inner handler
pub async fn require_authentication(State(authenticator): State<Authenticator>, request: Request, next: Next) -> Result<Response> {
    let mut cookies = HeaderMap::new();
    let request = authenticate_request(&authenticator, request, &mut cookies).await?;

    let mut response = next.run(request).await;
    for cookie in cookies.get_all(header::SET_COOKIE) {
        response.headers_mut().append(header::SET_COOKIE, cookie.clone());
    }
    Ok(response)
}

/// Protect every route of `router` with `authenticator`.
///
/// Uses a route layer, so unmatched paths still 404 instead of asking for credentials.
pub fn wrap<S>(router: Router<S>, authenticator: Authenticator) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(authenticator, require_authentication))
}
