use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "authgate";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed Authorization header: wrong scheme, bad base64 or no `user:password` pair.
    /// Raised before any backend is contacted.
    #[error("Wrong credentials")]
    WrongCredentials,

    /// Unknown or missing backend type for a configured backend name
    #[error("Authentication type unknown or backend not defined for: {name}")]
    BackendConfiguration { name: String },

    /// Verification failure reported by a backend (bad credentials, unreachable identity service, ...)
    #[error("{backend} authentication failed: {message}")]
    BackendAuthentication { backend: String, message: String },

    /// A protected route was reached without any credentials
    #[error("Not authenticated")]
    Unauthenticated,

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::WrongCredentials | Error::BackendAuthentication { .. } | Error::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::BackendConfiguration { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::WrongCredentials => "Wrong credentials".to_string(),
            // Backend messages can carry upstream transport details
            Error::BackendAuthentication { .. } => "Authentication failed".to_string(),
            Error::Unauthenticated => "Authentication required".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::BackendConfiguration { .. } | Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::BackendConfiguration { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::WrongCredentials | Error::BackendAuthentication { .. } | Error::Unauthenticated => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let mut response = (status, self.user_message()).into_response();
        if status == StatusCode::UNAUTHORIZED
            && let Ok(challenge) = HeaderValue::from_str(&format!("Basic realm=\"{AUTH_REALM}\""))
        {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
        }
        response
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
