//! HTTP surface of the gateway.
//!
//! - **Login** (`POST /login`): form login, answers with the session and permissions cookies
//! - **Identity** (`GET /api/me`): who the gateway thinks the caller is; behind [`crate::auth::middleware::wrap`]
//! - **Health** (`GET /healthz`): liveness, never authenticated

pub mod handlers;
pub mod models;
