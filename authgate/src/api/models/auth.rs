use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Form body of `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginInfo {
    pub username: String,
    pub permissions: Vec<String>,
}

/// Successful login: the body plus the `Set-Cookie` headers to send back
#[derive(Debug)]
pub struct LoginResponse {
    pub info: LoginInfo,
    pub cookies: HeaderMap,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.cookies, Json(self.info)).into_response()
    }
}

/// Body of `GET /api/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    /// Absent when the caller authenticated with the session cookie alone
    pub username: Option<String>,
    pub token_present: bool,
}
